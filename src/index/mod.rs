//! Index module for Pilum.
//!
//! This module provides segment writing and reading: the on-disk segment
//! layout, the numeric range index, the directory manifest, and the
//! writer/reader pair built on them.

pub mod directory;
pub mod numeric;
pub mod reader;
pub mod segment;
pub mod writer;

// Re-export commonly used types
pub use directory::{IndexDirectory, Manifest, SegmentMeta};
pub use numeric::{NumericIndex, NumericRange};
pub use reader::{IndexReader, Scan, SegmentInfo};
pub use segment::SegmentHeader;
pub use writer::{IndexWriter, IndexWriterConfig, OpenMode, WriterState};
