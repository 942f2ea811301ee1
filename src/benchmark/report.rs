//! Benchmark reports in human and JSON form.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::benchmark::config::BenchmarkConfig;
use crate::benchmark::harness::BenchmarkOutcome;
use crate::benchmark::operation::Operation;
use crate::benchmark::timing::{AggregatedTiming, PhaseTiming};
use crate::storage::AccessStrategy;

/// Derived figures for one phase. NaN values serialize as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseSummary {
    pub count: u64,
    pub total_ms: f64,
    pub mean_latency_ms: f64,
    pub throughput_per_sec: f64,
}

impl From<&PhaseTiming> for PhaseSummary {
    fn from(phase: &PhaseTiming) -> Self {
        PhaseSummary {
            count: phase.count,
            total_ms: phase.total_ms(),
            mean_latency_ms: phase.mean_latency_ms(),
            throughput_per_sec: phase.throughput(),
        }
    }
}

/// Everything printed at the end of a benchmark run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub generated_at: DateTime<Utc>,
    pub title: String,
    pub operation: Operation,
    pub location: String,
    pub access: AccessStrategy,
    pub concurrency: usize,
    pub shared_reader: bool,
    pub workers: usize,
    pub failed_workers: usize,
    pub errors: Vec<String>,
    pub elapsed_ms: f64,
    pub init: PhaseSummary,
    pub fetch: PhaseSummary,
    pub search: PhaseSummary,
    pub close: PhaseSummary,
    #[serde(skip)]
    pub timing: AggregatedTiming,
}

impl BenchmarkReport {
    pub fn new(config: &BenchmarkConfig, outcome: &BenchmarkOutcome) -> Self {
        let timing = outcome.timing;
        BenchmarkReport {
            generated_at: Utc::now(),
            title: config.operation.title().to_string(),
            operation: config.operation.clone(),
            location: config.location.display().to_string(),
            access: config.access,
            concurrency: config.concurrency,
            shared_reader: config.shared_reader,
            workers: outcome.workers,
            failed_workers: outcome.failed_workers,
            errors: outcome.errors.clone(),
            elapsed_ms: outcome.elapsed.as_secs_f64() * 1000.0,
            init: PhaseSummary::from(&timing.init),
            fetch: PhaseSummary::from(&timing.fetch),
            search: PhaseSummary::from(&timing.search),
            close: PhaseSummary::from(&timing.close),
            timing,
        }
    }

    /// Tab-separated latency table followed by the raw phase counts.
    pub fn render_human(&self) -> String {
        let cached = if self.operation.opens_own_readers() {
            "cached"
        } else {
            "noncached"
        };
        let pattern = self.operation.fetch_pattern();

        let mut out = String::new();
        let _ = writeln!(out, "Result for [{}]", self.title);
        let _ = writeln!(
            out,
            "Init \t({cached}) \tlatency \t{} ms",
            self.init.mean_latency_ms
        );
        let _ = writeln!(
            out,
            "Fetch \t({pattern}) \tlatency \t{} ms, fps {} /s",
            self.fetch.mean_latency_ms, self.fetch.throughput_per_sec
        );
        let _ = writeln!(
            out,
            "Search \t \t \tlatency \t{} ms",
            self.search.mean_latency_ms
        );
        let _ = writeln!(
            out,
            "Close \t({cached}) \tlatency \t{} ms",
            self.close.mean_latency_ms
        );
        let _ = writeln!(
            out,
            "{}, {}, {}",
            self.init.count, self.close.count, self.fetch.count
        );
        if self.failed_workers > 0 {
            let _ = writeln!(
                out,
                "{} of {} workers failed",
                self.failed_workers, self.workers
            );
        }
        out
    }

    /// JSON form of the report.
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}
