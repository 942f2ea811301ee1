//! Concurrent benchmark driver.
//!
//! Each worker is an OS thread that runs the configured operation once and
//! sends its result over a channel. The calling thread is the only
//! aggregator, so workers share nothing inside their timed regions.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use log::{debug, info, warn};

use crate::benchmark::config::BenchmarkConfig;
use crate::benchmark::operation::{Deadline, Operation, WorkerContext};
use crate::benchmark::timing::AggregatedTiming;
use crate::error::{PilumError, Result};
use crate::index::reader::IndexReader;
use crate::storage::AccessStrategy;

/// Result of a benchmark run.
#[derive(Debug, Clone)]
pub struct BenchmarkOutcome {
    /// Merged timings of the workers that succeeded.
    pub timing: AggregatedTiming,
    /// Workers started.
    pub workers: usize,
    /// Workers that failed, panicked or timed out.
    pub failed_workers: usize,
    /// Wall time of the whole run.
    pub elapsed: Duration,
    /// One message per failed worker.
    pub errors: Vec<String>,
}

impl BenchmarkOutcome {
    pub fn succeeded_workers(&self) -> usize {
        self.workers - self.failed_workers
    }
}

/// Runs a [`BenchmarkConfig`] across its worker threads.
#[derive(Debug, Clone)]
pub struct BenchmarkHarness {
    config: BenchmarkConfig,
}

impl BenchmarkHarness {
    /// Create a harness for a validated configuration.
    pub fn new(config: BenchmarkConfig) -> Result<Self> {
        config.validate()?;
        Ok(BenchmarkHarness { config })
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Run the benchmark.
    ///
    /// With `shared` given, every worker uses that reader. Otherwise, if the
    /// configuration asks for a shared reader, one is opened here (timed as
    /// init) and closed after the workers finish (timed as close). A worker
    /// failure is logged and excluded from the timings; only when every
    /// worker fails is the first failure returned as the error.
    pub fn run(&self, shared: Option<Arc<IndexReader>>) -> Result<BenchmarkOutcome> {
        let config = &self.config;
        let started = Instant::now();
        info!(
            "Starting benchmark {} with {} workers on {} ({})",
            config.operation,
            config.concurrency,
            config.location.display(),
            config.access
        );

        let mut timing = AggregatedTiming::new();
        let mut harness_reader = None;
        let shared = match shared {
            Some(reader) => Some(reader),
            None if config.shared_reader && !config.operation.opens_own_readers() => {
                let start = Instant::now();
                let reader = Arc::new(IndexReader::open(&config.location, config.access)?);
                timing.init.record(start.elapsed(), 1);
                harness_reader = Some(Arc::clone(&reader));
                Some(reader)
            }
            None => None,
        };

        let location: Arc<Path> = Arc::from(config.location.as_path());
        let (sender, receiver) = unbounded();
        let mut handles = Vec::with_capacity(config.concurrency);

        for worker_id in 0..config.concurrency {
            let sender = sender.clone();
            let operation = config.operation.clone();
            let ctx = WorkerContext {
                location: Arc::clone(&location),
                strategy: config.access,
                shared: shared.clone(),
                warmup_delay: config.warmup_delay,
                deadline: Deadline::never(),
                seed: config.seed.map(|seed| seed.wrapping_add(worker_id as u64)),
            };
            let deadline = config.deadline;

            let handle = thread::Builder::new()
                .name(format!("pilum-worker-{worker_id}"))
                .spawn(move || {
                    let ctx = WorkerContext {
                        deadline: Deadline::after(deadline),
                        ..ctx
                    };
                    let result = operation.execute(&ctx);
                    let _ = sender.send((worker_id, result));
                })?;
            handles.push(handle);
        }
        drop(sender);

        let WorkerResults {
            timing: worker_timing,
            reported,
            mut errors,
            first_error,
        } = collect_results(receiver.iter());
        timing.merge(&worker_timing);

        for handle in handles {
            if handle.join().is_err() {
                warn!("A benchmark worker panicked");
            }
        }
        let silent = config.concurrency - reported;
        for _ in 0..silent {
            errors.push("worker exited without reporting".to_string());
        }

        if let Some(reader) = harness_reader {
            let start = Instant::now();
            reader.close()?;
            timing.close.record(start.elapsed(), 1);
        }

        let failed_workers = errors.len();
        let outcome = BenchmarkOutcome {
            timing,
            workers: config.concurrency,
            failed_workers,
            elapsed: started.elapsed(),
            errors,
        };

        if failed_workers == config.concurrency {
            return Err(first_error
                .unwrap_or_else(|| PilumError::other("every benchmark worker panicked")));
        }

        info!(
            "Benchmark finished in {:.3} ms: {} workers succeeded, {} failed",
            outcome.elapsed.as_secs_f64() * 1000.0,
            outcome.succeeded_workers(),
            outcome.failed_workers
        );
        Ok(outcome)
    }
}

/// What the aggregator gathered from the worker result stream.
#[derive(Debug, Default)]
struct WorkerResults {
    /// Merged timings of the workers that succeeded.
    timing: AggregatedTiming,
    /// Workers that reported at all, successfully or not.
    reported: usize,
    errors: Vec<String>,
    first_error: Option<PilumError>,
}

/// Merge successful worker timings; log and set aside failures.
fn collect_results<I>(results: I) -> WorkerResults
where
    I: IntoIterator<Item = (usize, Result<AggregatedTiming>)>,
{
    let mut collected = WorkerResults::default();
    for (worker_id, result) in results {
        collected.reported += 1;
        match result {
            Ok(worker_timing) => {
                debug!(
                    "Worker {worker_id} finished: fetch {} in {:.3} ms, search {} hits, init {} close {}",
                    worker_timing.fetch.count,
                    worker_timing.fetch.total_ms(),
                    worker_timing.search.count,
                    worker_timing.init.count,
                    worker_timing.close.count
                );
                collected.timing.merge(&worker_timing);
            }
            Err(e) => {
                warn!("Worker {worker_id} failed: {e}");
                collected.errors.push(format!("worker {worker_id}: {e}"));
                collected.first_error.get_or_insert(e);
            }
        }
    }
    collected
}

/// Run `operation` on `concurrency` workers and return the merged timings.
///
/// Uses the default warm-up delay and no deadline.
pub fn run<P: AsRef<Path>>(
    operation: Operation,
    concurrency: usize,
    shared: Option<Arc<IndexReader>>,
    strategy: AccessStrategy,
    location: P,
) -> Result<AggregatedTiming> {
    let config = BenchmarkConfig::new(location.as_ref(), operation)
        .with_concurrency(concurrency)
        .with_access(strategy);
    BenchmarkHarness::new(config)?
        .run(shared)
        .map(|outcome| outcome.timing)
}

#[cfg(test)]
mod tests {
    use tempfile::{TempDir, tempdir};

    use super::*;
    use crate::document::document::Document;
    use crate::index::writer::{IndexWriter, IndexWriterConfig};

    fn build_index(count: i32) -> TempDir {
        let dir = tempdir().unwrap();
        let mut writer = IndexWriter::open(dir.path(), IndexWriterConfig::default()).unwrap();
        for i in 0..count {
            writer
                .add_document(Document::builder().add_integer("foo", i).build())
                .unwrap();
        }
        writer.finalize_segment().unwrap();
        dir
    }

    fn config(dir: &TempDir, operation: Operation) -> BenchmarkConfig {
        BenchmarkConfig::new(dir.path(), operation)
            .with_warmup_delay(Duration::ZERO)
            .with_seed(Some(1))
    }

    #[test]
    fn test_workers_are_merged() {
        let dir = build_index(30);
        let harness =
            BenchmarkHarness::new(config(&dir, Operation::SequentialScan).with_concurrency(4))
                .unwrap();
        let outcome = harness.run(None).unwrap();

        assert_eq!(outcome.workers, 4);
        assert_eq!(outcome.failed_workers, 0);
        assert_eq!(outcome.timing.fetch.count, 120);
        assert_eq!(outcome.timing.init.count, 4);
        assert_eq!(outcome.timing.close.count, 4);
    }

    #[test]
    fn test_configured_shared_reader_opened_once() {
        let dir = build_index(10);
        let harness = BenchmarkHarness::new(
            config(&dir, Operation::RandomFetch { count: 20 })
                .with_concurrency(3)
                .with_shared_reader(true),
        )
        .unwrap();
        let outcome = harness.run(None).unwrap();

        assert_eq!(outcome.timing.init.count, 1);
        assert_eq!(outcome.timing.close.count, 1);
        assert_eq!(outcome.timing.fetch.count, 60);
    }

    #[test]
    fn test_all_workers_failing_returns_error() {
        let dir = tempdir().unwrap();
        let harness = BenchmarkHarness::new(
            BenchmarkConfig::new(dir.path().join("missing"), Operation::SequentialScan)
                .with_concurrency(2),
        )
        .unwrap();
        assert!(matches!(harness.run(None), Err(PilumError::NotFound(_))));
    }

    #[test]
    fn test_mixed_results_exclude_failures() {
        let worker = |fetches: u64| {
            let mut timing = AggregatedTiming::new();
            timing.fetch.record(Duration::from_millis(2), fetches);
            timing.init.record(Duration::from_millis(1), 1);
            timing
        };
        let results: Vec<(usize, Result<AggregatedTiming>)> = vec![
            (0, Ok(worker(10))),
            (1, Err(PilumError::timeout("worker exceeded deadline of 5 ms"))),
            (2, Ok(worker(15))),
            (3, Err(PilumError::out_of_range("ordinal 9 of 4"))),
        ];

        let collected = collect_results(results);
        assert_eq!(collected.reported, 4);
        assert_eq!(collected.errors.len(), 2);
        assert!(collected.errors[0].starts_with("worker 1: "));
        assert!(collected.errors[1].starts_with("worker 3: "));
        assert!(matches!(collected.first_error, Some(PilumError::Timeout(_))));
        assert_eq!(collected.timing.fetch.count, 25);
        assert_eq!(collected.timing.fetch.nanos, 4_000_000);
        assert_eq!(collected.timing.init.count, 2);
    }

    #[test]
    fn test_empty_result_stream() {
        let collected = collect_results(std::iter::empty::<(usize, Result<AggregatedTiming>)>());
        assert_eq!(collected.reported, 0);
        assert!(collected.errors.is_empty());
        assert!(collected.first_error.is_none());
        assert!(collected.timing.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(BenchmarkHarness::new(BenchmarkConfig::default().with_concurrency(0)).is_err());
    }

    #[test]
    fn test_free_run() {
        let dir = build_index(8);
        let timing = run(
            Operation::SequentialScan,
            2,
            None,
            AccessStrategy::Buffered,
            dir.path(),
        )
        .unwrap();
        assert_eq!(timing.fetch.count, 16);
    }
}
