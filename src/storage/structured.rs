//! Structured binary I/O for segment data.
//!
//! [`StructWriter`] appends little-endian primitives to an in-memory buffer
//! while tracking a running CRC32. [`StructReader`] is the matching cursor
//! over a byte slice; running off the end is reported as corrupt data rather
//! than an I/O error because the slice is always a fully loaded region.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::error::{PilumError, Result};
use crate::util::varint::{decode_u64, write_u64};

/// A structured writer for binary data.
pub struct StructWriter {
    buffer: Vec<u8>,
    hasher: crc32fast::Hasher,
}

impl fmt::Debug for StructWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructWriter")
            .field("position", &self.buffer.len())
            .finish()
    }
}

impl Default for StructWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StructWriter {
    /// Create a new structured writer.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a writer with a pre-sized buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        StructWriter {
            buffer: Vec::with_capacity(capacity),
            hasher: crc32fast::Hasher::new(),
        }
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_raw(&[value])
    }

    /// Write a u16 value (little-endian).
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        let start = self.buffer.len();
        self.buffer.write_u16::<LittleEndian>(value)?;
        self.hasher.update(&self.buffer[start..]);
        Ok(())
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        let start = self.buffer.len();
        self.buffer.write_u32::<LittleEndian>(value)?;
        self.hasher.update(&self.buffer[start..]);
        Ok(())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        let start = self.buffer.len();
        self.buffer.write_u64::<LittleEndian>(value)?;
        self.hasher.update(&self.buffer[start..]);
        Ok(())
    }

    /// Write an i32 value (little-endian).
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        let start = self.buffer.len();
        self.buffer.write_i32::<LittleEndian>(value)?;
        self.hasher.update(&self.buffer[start..]);
        Ok(())
    }

    /// Write a f64 value (little-endian).
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        let start = self.buffer.len();
        self.buffer.write_f64::<LittleEndian>(value)?;
        self.hasher.update(&self.buffer[start..]);
        Ok(())
    }

    /// Write a variable-length integer.
    pub fn write_varint(&mut self, value: u64) -> Result<()> {
        let start = self.buffer.len();
        write_u64(&mut self.buffer, value)?;
        self.hasher.update(&self.buffer[start..]);
        Ok(())
    }

    /// Write a string with length prefix.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_varint(value.len() as u64)?;
        self.write_raw(value.as_bytes())
    }

    /// Write raw bytes without length prefix.
    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(value);
        self.hasher.update(value);
        Ok(())
    }

    /// Get current position.
    pub fn position(&self) -> u64 {
        self.buffer.len() as u64
    }

    /// CRC32 of everything written so far.
    pub fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Consume the writer and return the written bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

/// A structured reader over a byte slice.
#[derive(Debug, Clone)]
pub struct StructReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> StructReader<'a> {
    /// Create a new structured reader.
    pub fn new(data: &'a [u8]) -> Self {
        StructReader { data, position: 0 }
    }

    fn take(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(length)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                PilumError::corrupt(format!(
                    "unexpected end of data: need {length} bytes at offset {}, have {}",
                    self.position,
                    self.data.len()
                ))
            })?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Read a u8 value.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a u16 value (little-endian).
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    /// Read a u64 value (little-endian).
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// Read an i32 value (little-endian).
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    /// Read a f64 value (little-endian).
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.take(8)?))
    }

    /// Read a variable-length integer.
    pub fn read_varint(&mut self) -> Result<u64> {
        let (value, consumed) = decode_u64(&self.data[self.position..])?;
        self.position += consumed;
        Ok(value)
    }

    /// Read a string with length prefix.
    pub fn read_string(&mut self) -> Result<String> {
        let length = usize::try_from(self.read_varint()?)
            .map_err(|_| PilumError::corrupt("string length overflows usize"))?;
        let bytes = self.take(length)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| PilumError::corrupt(format!("Invalid UTF-8: {e}")))
    }

    /// Read exact number of raw bytes.
    pub fn read_raw(&mut self, length: usize) -> Result<&'a [u8]> {
        self.take(length)
    }

    /// Get current position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Check if we're at the end of the data.
    pub fn is_eof(&self) -> bool {
        self.position >= self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_writer_reader() {
        let mut writer = StructWriter::new();
        writer.write_u8(42).unwrap();
        writer.write_u16(1234).unwrap();
        writer.write_u32(0xDEADBEEF).unwrap();
        writer.write_u64(u64::MAX - 1).unwrap();
        writer.write_i32(-17).unwrap();
        writer.write_f64(std::f64::consts::PI).unwrap();
        writer.write_varint(300).unwrap();
        writer.write_string("我们是中文呀").unwrap();

        let bytes = writer.into_inner();
        let mut reader = StructReader::new(&bytes);

        assert_eq!(reader.read_u8().unwrap(), 42);
        assert_eq!(reader.read_u16().unwrap(), 1234);
        assert_eq!(reader.read_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_u64().unwrap(), u64::MAX - 1);
        assert_eq!(reader.read_i32().unwrap(), -17);
        assert_eq!(reader.read_f64().unwrap(), std::f64::consts::PI);
        assert_eq!(reader.read_varint().unwrap(), 300);
        assert_eq!(reader.read_string().unwrap(), "我们是中文呀");
        assert!(reader.is_eof());
    }

    #[test]
    fn test_checksum_covers_all_writes() {
        let mut writer = StructWriter::new();
        writer.write_u32(7).unwrap();
        writer.write_string("abc").unwrap();

        let checksum = writer.checksum();
        let bytes = writer.into_inner();
        assert_eq!(checksum, crc32fast::hash(&bytes));
    }

    #[test]
    fn test_truncated_read_is_corrupt() {
        let bytes = [1u8, 2, 3];
        let mut reader = StructReader::new(&bytes);

        assert!(matches!(reader.read_u32(), Err(PilumError::CorruptData(_))));
        // A failed read does not advance the cursor.
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.remaining(), 3);
    }

    #[test]
    fn test_invalid_utf8_is_corrupt() {
        let bytes = [2u8, 0xFF, 0xFE];
        let mut reader = StructReader::new(&bytes);

        assert!(matches!(
            reader.read_string(),
            Err(PilumError::CorruptData(_))
        ));
    }
}
