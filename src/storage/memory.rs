//! Whole-file buffered segment access.

use std::fs::File;
use std::io::Read;

use crate::error::Result;
use crate::storage::checked_range;

/// A segment file read entirely into memory at open time.
#[derive(Debug)]
pub struct BufferedFile {
    data: Box<[u8]>,
}

impl BufferedFile {
    /// Read all `len` bytes of `file`.
    pub fn load(mut file: File, len: u64) -> Result<Self> {
        let mut data = Vec::with_capacity(len as usize);
        file.read_to_end(&mut data)?;
        Ok(BufferedFile {
            data: data.into_boxed_slice(),
        })
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn read_at(&self, offset: u64, len: usize) -> Result<&[u8]> {
        let range = checked_range(offset, len, self.len())?;
        Ok(&self.data[range])
    }
}
