//! Paged segment access through a shared file handle.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use parking_lot::Mutex;

use crate::error::Result;
use crate::storage::checked_range;

/// A segment file read on demand with seek + read.
///
/// The handle is shared by every caller, so reads are serialized on its
/// lock. Repeated reads are served from the OS page cache.
#[derive(Debug)]
pub struct PagedFile {
    /// The open file handle.
    file: Mutex<File>,
    /// File length captured at open time.
    len: u64,
}

impl PagedFile {
    pub fn new(file: File, len: u64) -> Self {
        PagedFile {
            file: Mutex::new(file),
            len,
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy `len` bytes starting at `offset` out of the file.
    pub fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        checked_range(offset, len, self.len)?;
        let mut buffer = vec![0u8; len];
        if len == 0 {
            return Ok(buffer);
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}
