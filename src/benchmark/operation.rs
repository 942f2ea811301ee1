//! Benchmark operations and their per-worker execution.

use std::fmt;
use std::hint::black_box;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::benchmark::timing::AggregatedTiming;
use crate::document::document::Document;
use crate::document::generator::{INDEXED_TEXT_FIELD, INT_FIELD};
use crate::error::{PilumError, Result};
use crate::index::numeric::NumericRange;
use crate::index::reader::IndexReader;
use crate::storage::AccessStrategy;

/// Field searched by default.
pub const DEFAULT_SEARCH_FIELD: &str = INT_FIELD;
/// Default exclusive lower bound for range searches.
pub const DEFAULT_THRESHOLD: i32 = 100_000;
/// Default number of random fetches per worker.
pub const DEFAULT_FETCH_COUNT: i64 = 10_000;
/// Default number of open/close iterations per worker.
pub const DEFAULT_OPEN_CLOSE_COUNT: u64 = 1_000;

/// Access pattern a worker performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Fetch every document in ordinal order.
    SequentialScan,
    /// Range query `field > threshold`, then fetch every hit.
    RangeSearch { field: String, threshold: i32 },
    /// Uniform random fetches; `count <= 0` means one per document.
    ///
    /// Ordinals are drawn from `[0, min(draws, docCount))`, so a count larger
    /// than the segment never reaches past its last document.
    RandomFetch { count: i64 },
    /// Open and close a reader `count` times.
    RepeatedOpenClose { count: u64 },
}

impl Default for Operation {
    fn default() -> Self {
        Operation::RandomFetch {
            count: DEFAULT_FETCH_COUNT,
        }
    }
}

impl Operation {
    /// Range search over the default field and threshold.
    pub fn default_search() -> Self {
        Operation::RangeSearch {
            field: DEFAULT_SEARCH_FIELD.to_string(),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Report title.
    pub fn title(&self) -> &'static str {
        match self {
            Operation::SequentialScan => "SEQ SCAN",
            Operation::RangeSearch { .. } => "SEQ SEARCH",
            Operation::RandomFetch { .. } => "RAND FETCH",
            Operation::RepeatedOpenClose { .. } => "REP On/Ce",
        }
    }

    /// Short label for the fetch access pattern.
    pub fn fetch_pattern(&self) -> &'static str {
        match self {
            Operation::SequentialScan => "seqscan",
            Operation::RangeSearch { .. } => "seqskip",
            Operation::RandomFetch { .. } => "randfetch",
            Operation::RepeatedOpenClose { .. } => "rep o / c",
        }
    }

    /// Whether the operation ignores a shared reader.
    pub fn opens_own_readers(&self) -> bool {
        matches!(self, Operation::RepeatedOpenClose { .. })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::SequentialScan => write!(f, "sequential-scan"),
            Operation::RangeSearch { field, threshold } => {
                write!(f, "range-search({field} > {threshold})")
            }
            Operation::RandomFetch { count } => write!(f, "random-fetch({count})"),
            Operation::RepeatedOpenClose { count } => write!(f, "open-close({count})"),
        }
    }
}

/// Point in time after which a worker gives up.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
    limit: Option<Duration>,
}

impl Deadline {
    /// Deadline `limit` from now; `None` never expires.
    pub fn after(limit: Option<Duration>) -> Self {
        Deadline {
            at: limit.and_then(|limit| Instant::now().checked_add(limit)),
            limit,
        }
    }

    pub fn never() -> Self {
        Self::after(None)
    }

    /// The same limit, counted from now.
    pub fn restart(&self) -> Self {
        Self::after(self.limit)
    }

    /// Fail with `Timeout` once the deadline has passed.
    pub fn check(&self) -> Result<()> {
        match (self.at, self.limit) {
            (Some(at), Some(limit)) if Instant::now() >= at => Err(PilumError::timeout(format!(
                "worker exceeded deadline of {} ms",
                limit.as_millis()
            ))),
            _ => Ok(()),
        }
    }
}

/// Everything one worker needs to run an operation.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    /// Index directory or segment file.
    pub location: Arc<Path>,
    pub strategy: AccessStrategy,
    /// Reader shared by all workers, if any.
    pub shared: Option<Arc<IndexReader>>,
    /// Pause before timed random fetches.
    pub warmup_delay: Duration,
    pub deadline: Deadline,
    /// RNG seed for random fetches.
    pub seed: Option<u64>,
}

impl WorkerContext {
    fn open_reader(&self, timing: &mut AggregatedTiming) -> Result<IndexReader> {
        let start = Instant::now();
        let reader = IndexReader::open(&*self.location, self.strategy)?;
        timing.init.record(start.elapsed(), 1);
        Ok(reader)
    }

    fn close_reader(
        &self,
        reader: &IndexReader,
        timing: &mut AggregatedTiming,
    ) -> Result<()> {
        let start = Instant::now();
        reader.close()?;
        timing.close.record(start.elapsed(), 1);
        Ok(())
    }
}

/// Touch the fields a reader would consume.
fn consume(doc: &Document) {
    black_box(doc.get(INT_FIELD));
    black_box(doc.get(INDEXED_TEXT_FIELD));
}

impl Operation {
    /// Run the operation once on the calling thread.
    pub fn execute(&self, ctx: &WorkerContext) -> Result<AggregatedTiming> {
        let mut timing = AggregatedTiming::new();

        if let Operation::RepeatedOpenClose { count } = self {
            for _ in 0..*count {
                let reader = ctx.open_reader(&mut timing)?;
                ctx.close_reader(&reader, &mut timing)?;
                ctx.deadline.check()?;
            }
            return Ok(timing);
        }

        let (reader, owned) = match &ctx.shared {
            Some(shared) => (Arc::clone(shared), false),
            None => (Arc::new(ctx.open_reader(&mut timing)?), true),
        };

        match self {
            Operation::SequentialScan => scan(&reader, ctx, &mut timing)?,
            Operation::RangeSearch { field, threshold } => {
                search(&reader, field, *threshold, ctx, &mut timing)?
            }
            Operation::RandomFetch { count } => random_fetch(&reader, *count, ctx, &mut timing)?,
            Operation::RepeatedOpenClose { .. } => {}
        }

        if owned {
            ctx.close_reader(&reader, &mut timing)?;
        }
        Ok(timing)
    }
}

fn scan(
    reader: &IndexReader,
    ctx: &WorkerContext,
    timing: &mut AggregatedTiming,
) -> Result<()> {
    let doc_count = reader.document_count()?;
    let start = Instant::now();
    for doc in reader.scan()? {
        consume(&doc?);
        ctx.deadline.check()?;
    }
    timing.fetch.record(start.elapsed(), doc_count);
    Ok(())
}

fn search(
    reader: &IndexReader,
    field: &str,
    threshold: i32,
    ctx: &WorkerContext,
    timing: &mut AggregatedTiming,
) -> Result<()> {
    let start = Instant::now();
    let hits = reader.range_query(field, &NumericRange::greater_than(threshold))?;
    timing.search.record(start.elapsed(), hits.len() as u64);
    ctx.deadline.check()?;

    let in_ordinal_order = hits.windows(2).all(|w| w[0] <= w[1]);
    debug!(
        "Range search {field} > {threshold}: {} hits, ordinal order: {in_ordinal_order}",
        hits.len()
    );

    let start = Instant::now();
    for &ordinal in &hits {
        consume(&reader.fetch(ordinal)?);
        ctx.deadline.check()?;
    }
    timing.fetch.record(start.elapsed(), hits.len() as u64);
    Ok(())
}

fn random_fetch(
    reader: &IndexReader,
    count: i64,
    ctx: &WorkerContext,
    timing: &mut AggregatedTiming,
) -> Result<()> {
    // The warm-up pause does not count toward the worker's deadline.
    if !ctx.warmup_delay.is_zero() {
        thread::sleep(ctx.warmup_delay);
    }
    let deadline = ctx.deadline.restart();
    deadline.check()?;

    let doc_count = reader.document_count()?;
    let draws = if count > 0 { count as u64 } else { doc_count };
    let universe = draws.min(doc_count);
    if universe == 0 {
        if draws > 0 {
            return Err(PilumError::out_of_range(
                "random fetch over an empty segment",
            ));
        }
        return Ok(());
    }

    let mut rng = match ctx.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let start = Instant::now();
    for _ in 0..draws {
        let ordinal = rng.random_range(0..universe);
        consume(&reader.fetch(ordinal)?);
        deadline.check()?;
    }
    timing.fetch.record(start.elapsed(), draws);
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::{TempDir, tempdir};

    use super::*;
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

    fn context(dir: &TempDir, shared: Option<Arc<IndexReader>>) -> WorkerContext {
        WorkerContext {
            location: Arc::from(dir.path()),
            strategy: AccessStrategy::Mmap,
            shared,
            warmup_delay: Duration::ZERO,
            deadline: Deadline::never(),
            seed: Some(7),
        }
    }

    #[test]
    fn test_scan_counts() {
        let dir = build_index(20);
        let timing = Operation::SequentialScan
            .execute(&context(&dir, None))
            .unwrap();
        assert_eq!(timing.fetch.count, 20);
        assert_eq!(timing.init.count, 1);
        assert_eq!(timing.close.count, 1);
        assert_eq!(timing.search.count, 0);
    }

    #[test]
    fn test_search_counts_hits() {
        let dir = build_index(100);
        let operation = Operation::RangeSearch {
            field: "foo".to_string(),
            threshold: 50,
        };
        let timing = operation.execute(&context(&dir, None)).unwrap();
        assert_eq!(timing.search.count, 49);
        assert_eq!(timing.fetch.count, 49);
    }

    #[test]
    fn test_shared_reader_skips_init_and_close() {
        let dir = build_index(10);
        let shared = Arc::new(IndexReader::open(dir.path(), AccessStrategy::Mmap).unwrap());
        let timing = Operation::RandomFetch { count: 25 }
            .execute(&context(&dir, Some(Arc::clone(&shared))))
            .unwrap();

        assert_eq!(timing.fetch.count, 25);
        assert_eq!(timing.init.count, 0);
        assert_eq!(timing.close.count, 0);
        assert!(!shared.is_closed());
    }

    #[test]
    fn test_random_fetch_non_positive_count_uses_doc_count() {
        let dir = build_index(12);
        let timing = Operation::RandomFetch { count: 0 }
            .execute(&context(&dir, None))
            .unwrap();
        assert_eq!(timing.fetch.count, 12);
    }

    #[test]
    fn test_open_close_ignores_shared_reader() {
        let dir = build_index(3);
        let shared = Arc::new(IndexReader::open(dir.path(), AccessStrategy::Mmap).unwrap());
        let timing = Operation::RepeatedOpenClose { count: 5 }
            .execute(&context(&dir, Some(shared)))
            .unwrap();
        assert_eq!(timing.init.count, 5);
        assert_eq!(timing.close.count, 5);
        assert_eq!(timing.fetch.count, 0);
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let dir = build_index(3);
        let mut ctx = context(&dir, None);
        ctx.deadline = Deadline::after(Some(Duration::ZERO));
        assert!(matches!(
            Operation::SequentialScan.execute(&ctx),
            Err(PilumError::Timeout(_))
        ));
    }

    #[test]
    fn test_warmup_does_not_count_toward_deadline() {
        let dir = build_index(10);
        let mut ctx = context(&dir, None);
        ctx.warmup_delay = Duration::from_millis(300);
        ctx.deadline = Deadline::after(Some(Duration::from_millis(200)));

        let timing = Operation::RandomFetch { count: 5 }.execute(&ctx).unwrap();
        assert_eq!(timing.fetch.count, 5);
    }

    #[test]
    fn test_random_fetch_clamps_universe_to_doc_count() {
        let dir = build_index(4);
        let timing = Operation::RandomFetch { count: 50 }
            .execute(&context(&dir, None))
            .unwrap();
        assert_eq!(timing.fetch.count, 50);
    }

    #[test]
    fn test_missing_index_fails() {
        let dir = tempdir().unwrap();
        let ctx = WorkerContext {
            location: Arc::from(dir.path().join("missing").as_path()),
            ..context(&dir, None)
        };
        assert!(matches!(
            Operation::SequentialScan.execute(&ctx),
            Err(PilumError::NotFound(_))
        ));
    }

    #[test]
    fn test_operation_serde() {
        let json = serde_json::to_string(&Operation::default_search()).unwrap();
        assert_eq!(
            json,
            r#"{"type":"range_search","field":"foo","threshold":100000}"#
        );
        let decoded: Operation = serde_json::from_str(r#"{"type":"random_fetch","count":5}"#).unwrap();
        assert_eq!(decoded, Operation::RandomFetch { count: 5 });
    }
}
