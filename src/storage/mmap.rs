//! Memory-mapped segment access.

use std::fs::File;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};

use crate::error::{PilumError, Result};
use crate::storage::checked_range;

/// A segment file mapped read-only into memory.
#[derive(Debug)]
pub struct MmapFile {
    mmap: Mmap,
}

impl MmapFile {
    /// Map `file` (opened from `path`) into memory.
    pub fn map(file: &File, path: &Path) -> Result<Self> {
        // SAFETY: segment files are write-once; they are renamed into place
        // after being fully written and never modified afterwards.
        let mmap = unsafe {
            MmapOptions::new().map(file).map_err(|e| {
                PilumError::other(format!("Failed to mmap file {}: {e}", path.display()))
            })?
        };
        Ok(MmapFile { mmap })
    }

    pub fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    pub fn read_at(&self, offset: u64, len: usize) -> Result<&[u8]> {
        let range = checked_range(offset, len, self.len())?;
        Ok(&self.mmap[range])
    }
}
