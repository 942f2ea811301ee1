//! Segment file access layer for Pilum.
//!
//! A finalized segment is a single immutable file. Readers never stream it;
//! they issue positional reads for the header, offset tables and blocks they
//! need. How those reads are served is the [`AccessStrategy`]:
//!
//! - **Buffered**: the whole file is read into memory at open time
//!   ([`memory::BufferedFile`]).
//! - **Paged**: every read is a seek + read on a shared file handle, served
//!   by the OS page cache ([`file::PagedFile`]).
//! - **Mmap**: the file is memory-mapped and reads are slices of the mapping
//!   ([`mmap::MmapFile`]).
//!
//! The strategy changes latency, never results.
//!
//! # Example
//!
//! ```no_run
//! use pilum::storage::{AccessStrategy, SegmentData};
//!
//! # fn main() -> pilum::error::Result<()> {
//! let data = SegmentData::open("tmp-codec/seg_1.plm", AccessStrategy::Mmap)?;
//! let magic = data.read_at(0, 4)?;
//! assert_eq!(&magic[..], b"PLM1");
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::ops::Range;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{PilumError, Result};

pub mod file;
pub mod memory;
pub mod mmap;
pub mod structured;

use file::PagedFile;
use memory::BufferedFile;
use mmap::MmapFile;

/// I/O method used to read segment bytes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AccessStrategy {
    /// Read the whole file into memory on open.
    Buffered,
    /// Positional reads through a shared file handle.
    Paged,
    /// Memory-map the file.
    #[default]
    Mmap,
}

impl fmt::Display for AccessStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessStrategy::Buffered => "buffered",
            AccessStrategy::Paged => "paged",
            AccessStrategy::Mmap => "mmap",
        };
        f.write_str(name)
    }
}

/// Read-only bytes of one segment file, served by the chosen strategy.
#[derive(Debug)]
pub enum SegmentData {
    Buffered(BufferedFile),
    Paged(PagedFile),
    Mapped(MmapFile),
}

impl SegmentData {
    /// Open the file at `path` with the given access strategy.
    ///
    /// A missing file is reported as [`PilumError::NotFound`]; an empty file
    /// cannot hold a segment header and is reported as corrupt.
    pub fn open<P: AsRef<Path>>(path: P, strategy: AccessStrategy) -> Result<Self> {
        let path = path.as_ref();
        let file = open_file(path)?;
        let len = file.metadata()?.len();
        if len == 0 {
            return Err(PilumError::corrupt(format!(
                "segment file is empty: {}",
                path.display()
            )));
        }

        let data = match strategy {
            AccessStrategy::Buffered => SegmentData::Buffered(BufferedFile::load(file, len)?),
            AccessStrategy::Paged => SegmentData::Paged(PagedFile::new(file, len)),
            AccessStrategy::Mmap => SegmentData::Mapped(MmapFile::map(&file, path)?),
        };
        Ok(data)
    }

    /// The strategy this data was opened with.
    pub fn strategy(&self) -> AccessStrategy {
        match self {
            SegmentData::Buffered(_) => AccessStrategy::Buffered,
            SegmentData::Paged(_) => AccessStrategy::Paged,
            SegmentData::Mapped(_) => AccessStrategy::Mmap,
        }
    }

    /// Total length in bytes.
    pub fn len(&self) -> u64 {
        match self {
            SegmentData::Buffered(data) => data.len(),
            SegmentData::Paged(data) => data.len(),
            SegmentData::Mapped(data) => data.len(),
        }
    }

    /// Whether the file holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read `len` bytes starting at `offset`.
    ///
    /// Buffered and mapped data return borrowed slices; paged data copies.
    pub fn read_at(&self, offset: u64, len: usize) -> Result<Cow<'_, [u8]>> {
        match self {
            SegmentData::Buffered(data) => data.read_at(offset, len).map(Cow::Borrowed),
            SegmentData::Paged(data) => data.read_at(offset, len).map(Cow::Owned),
            SegmentData::Mapped(data) => data.read_at(offset, len).map(Cow::Borrowed),
        }
    }
}

/// A byte range of a segment file holding one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Absolute offset of the first byte.
    pub offset: u64,
    /// Region length in bytes.
    pub len: u64,
}

impl Region {
    pub fn new(offset: u64, len: u64) -> Self {
        Region { offset, len }
    }

    /// Read `len` bytes at `relative` offset inside this region.
    ///
    /// Reads that would leave the region are corrupt data even when they
    /// would still fall inside the file.
    pub fn read<'a>(
        &self,
        data: &'a SegmentData,
        relative: u64,
        len: usize,
    ) -> Result<Cow<'a, [u8]>> {
        checked_range(relative, len, self.len)?;
        data.read_at(self.offset + relative, len)
    }
}

/// Open a file for reading, mapping a missing path to `NotFound`.
pub(crate) fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PilumError::not_found(format!("no segment at {}", path.display()))
        } else {
            PilumError::Io(e)
        }
    })
}

/// Validate that `[offset, offset + len)` lies within a file of `total` bytes.
pub(crate) fn checked_range(offset: u64, len: usize, total: u64) -> Result<Range<usize>> {
    let end = offset
        .checked_add(len as u64)
        .filter(|&end| end <= total)
        .ok_or_else(|| {
            PilumError::corrupt(format!(
                "read of {len} bytes at offset {offset} exceeds file length {total}"
            ))
        })?;
    Ok(offset as usize..end as usize)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::tempdir;

    use super::*;

    fn write_file(dir: &Path, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join("data.bin");
        let mut file = File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn test_all_strategies_read_same_bytes() {
        let dir = tempdir().unwrap();
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let path = write_file(dir.path(), &payload);

        for strategy in [
            AccessStrategy::Buffered,
            AccessStrategy::Paged,
            AccessStrategy::Mmap,
        ] {
            let data = SegmentData::open(&path, strategy).unwrap();
            assert_eq!(data.strategy(), strategy);
            assert_eq!(data.len(), payload.len() as u64);
            assert_eq!(&data.read_at(4000, 300).unwrap()[..], &payload[4000..4300]);
            assert!(data.read_at(9_990, 0).unwrap().is_empty());
        }
    }

    #[test]
    fn test_read_past_end_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), b"0123456789");

        for strategy in [
            AccessStrategy::Buffered,
            AccessStrategy::Paged,
            AccessStrategy::Mmap,
        ] {
            let data = SegmentData::open(&path, strategy).unwrap();
            assert!(matches!(
                data.read_at(8, 4),
                Err(PilumError::CorruptData(_))
            ));
        }
    }

    #[test]
    fn test_region_reads_are_bounded() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), b"headerREGIONtrailer");
        let data = SegmentData::open(&path, AccessStrategy::Buffered).unwrap();
        let region = Region::new(6, 6);

        assert_eq!(&region.read(&data, 0, 6).unwrap()[..], b"REGION");
        assert!(matches!(
            region.read(&data, 4, 4),
            Err(PilumError::CorruptData(_))
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let result = SegmentData::open(dir.path().join("missing.plm"), AccessStrategy::Mmap);
        assert!(matches!(result, Err(PilumError::NotFound(_))));
    }

    #[test]
    fn test_empty_file_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), b"");
        let result = SegmentData::open(&path, AccessStrategy::Paged);
        assert!(matches!(result, Err(PilumError::CorruptData(_))));
    }

    #[test]
    fn test_strategy_serde_names() {
        assert_eq!(
            serde_json::to_string(&AccessStrategy::Paged).unwrap(),
            "\"paged\""
        );
        let parsed: AccessStrategy = serde_json::from_str("\"mmap\"").unwrap();
        assert_eq!(parsed, AccessStrategy::Mmap);
        assert_eq!(AccessStrategy::Buffered.to_string(), "buffered");
    }
}
