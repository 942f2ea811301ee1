//! # Pilum
//!
//! A minimal segment-oriented document store with pluggable stored-fields
//! codecs, plus a concurrent micro-benchmark harness for measuring how it
//! reads.
//!
//! ## Features
//!
//! - Immutable single-file segments with a checksummed header
//! - Plain and LZ4 block-compressing stored-fields codecs
//! - Sorted numeric index for integer range queries
//! - Buffered, paged and memory-mapped segment access
//! - Multi-threaded benchmark harness with aggregated timings

pub mod benchmark;
pub mod cli;
pub mod codec;
pub mod document;
pub mod error;
pub mod index;
pub mod storage;
pub mod store;
pub mod util;

pub mod prelude {
    pub use crate::benchmark::{AggregatedTiming, BenchmarkConfig, BenchmarkHarness, Operation};
    pub use crate::codec::CodecDescriptor;
    pub use crate::document::{Document, DocumentGenerator, FieldValue};
    pub use crate::error::{PilumError, Result};
    pub use crate::index::{IndexReader, IndexWriter, IndexWriterConfig, NumericRange, OpenMode};
    pub use crate::storage::AccessStrategy;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
