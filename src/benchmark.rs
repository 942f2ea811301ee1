//! Concurrent micro-benchmark harness.
//!
//! A benchmark run starts `concurrency` worker threads. Each performs one
//! [`Operation`] against an index, either through its own reader or a
//! shared one, and reports an [`AggregatedTiming`]. The calling thread
//! merges the reports into a [`BenchmarkOutcome`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use pilum::benchmark::{BenchmarkConfig, BenchmarkHarness, Operation};
//!
//! # fn main() -> pilum::error::Result<()> {
//! let config = BenchmarkConfig::new("tmp-codec", Operation::RandomFetch { count: 1000 })
//!     .with_concurrency(8)
//!     .with_warmup_delay(Duration::ZERO);
//! let outcome = BenchmarkHarness::new(config)?.run(None)?;
//! println!("{} fetches", outcome.timing.fetch.count);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod harness;
pub mod operation;
pub mod report;
pub mod timing;

pub use config::BenchmarkConfig;
pub use harness::{BenchmarkHarness, BenchmarkOutcome, run};
pub use operation::{Deadline, Operation, WorkerContext};
pub use report::{BenchmarkReport, PhaseSummary};
pub use timing::{AggregatedTiming, PhaseTiming};
