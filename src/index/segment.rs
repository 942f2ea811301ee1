//! On-disk segment layout.
//!
//! A segment is one file: a fixed 56-byte header, the stored-fields region
//! and the numeric index region. All integers are little-endian.
//!
//! ```text
//! 0   magic "PLM1"
//! 4   u16 version
//! 6   u8  codec id
//! 7   u8  reserved
//! 8   u32 codec parameter
//! 12  u64 doc count
//! 20  u64 stored offset,  28 u64 stored length
//! 36  u64 numeric offset, 44 u64 numeric length
//! 52  u32 crc32 of bytes 0..52
//! ```

use std::collections::HashMap;

use crate::codec::descriptor::CodecDescriptor;
use crate::error::{PilumError, Result};
use crate::index::numeric::NumericIndex;
use crate::storage::Region;
use crate::storage::structured::{StructReader, StructWriter};

/// File magic.
pub const MAGIC: &[u8; 4] = b"PLM1";
/// Current format version.
pub const VERSION: u16 = 1;
/// Header length in bytes, checksum included.
pub const HEADER_LEN: usize = 56;

const CHECKSUMMED_LEN: usize = HEADER_LEN - 4;

/// Decoded segment header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    pub codec: CodecDescriptor,
    pub doc_count: u64,
    pub stored: Region,
    pub numeric: Region,
}

impl SegmentHeader {
    /// Serialize to exactly [`HEADER_LEN`] bytes.
    pub fn write(&self) -> Result<Vec<u8>> {
        let mut writer = StructWriter::with_capacity(HEADER_LEN);
        writer.write_raw(MAGIC)?;
        writer.write_u16(VERSION)?;
        writer.write_u8(self.codec.id())?;
        writer.write_u8(0)?;
        writer.write_u32(self.codec.parameter())?;
        writer.write_u64(self.doc_count)?;
        writer.write_u64(self.stored.offset)?;
        writer.write_u64(self.stored.len)?;
        writer.write_u64(self.numeric.offset)?;
        writer.write_u64(self.numeric.len)?;

        let checksum = writer.checksum();
        writer.write_u32(checksum)?;
        Ok(writer.into_inner())
    }

    /// Parse and checksum a header.
    pub fn read(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(PilumError::corrupt(format!(
                "segment header needs {HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let mut reader = StructReader::new(&bytes[..HEADER_LEN]);
        let magic = reader.read_raw(4)?;
        if magic != MAGIC {
            return Err(PilumError::corrupt(format!("bad segment magic {magic:02x?}")));
        }
        let version = reader.read_u16()?;
        if version != VERSION {
            return Err(PilumError::corrupt(format!(
                "unsupported segment version {version}"
            )));
        }

        let codec_id = reader.read_u8()?;
        let _reserved = reader.read_u8()?;
        let parameter = reader.read_u32()?;
        let doc_count = reader.read_u64()?;
        let stored = Region::new(reader.read_u64()?, reader.read_u64()?);
        let numeric = Region::new(reader.read_u64()?, reader.read_u64()?);

        let stored_crc = reader.read_u32()?;
        let actual_crc = crc32fast::hash(&bytes[..CHECKSUMMED_LEN]);
        if stored_crc != actual_crc {
            return Err(PilumError::corrupt(format!(
                "segment header checksum mismatch: stored {stored_crc:08x}, computed {actual_crc:08x}"
            )));
        }

        Ok(SegmentHeader {
            codec: CodecDescriptor::from_parts(codec_id, parameter)?,
            doc_count,
            stored,
            numeric,
        })
    }

    /// Check that both regions sit after the header and inside the file.
    pub fn validate(&self, file_len: u64) -> Result<()> {
        for (name, region) in [("stored", self.stored), ("numeric", self.numeric)] {
            let end = region.offset.checked_add(region.len);
            if region.offset < HEADER_LEN as u64 || end.is_none_or(|end| end > file_len) {
                return Err(PilumError::corrupt(format!(
                    "{name} region {}+{} outside segment of {file_len} bytes",
                    region.offset, region.len
                )));
            }
        }
        Ok(())
    }
}

/// Serialize the numeric region: u32 field count, then each index.
pub fn write_numeric_region(indexes: &[NumericIndex]) -> Result<Vec<u8>> {
    let mut writer = StructWriter::new();
    writer.write_u32(indexes.len() as u32)?;
    for index in indexes {
        index.write_to(&mut writer)?;
    }
    Ok(writer.into_inner())
}

/// Parse the numeric region, keyed by field name.
///
/// Every ordinal must lie in `[0, doc_count)`.
pub fn read_numeric_region(bytes: &[u8], doc_count: u64) -> Result<HashMap<String, NumericIndex>> {
    let mut reader = StructReader::new(bytes);
    let field_count = reader.read_u32()?;
    // Each index needs at least a one-byte name length and a u64 entry count.
    if field_count as usize > reader.remaining() / 9 {
        return Err(PilumError::corrupt(format!(
            "numeric region claims {field_count} fields, region too short"
        )));
    }

    let mut indexes = HashMap::with_capacity(field_count as usize);
    for _ in 0..field_count {
        let index = NumericIndex::read_from(&mut reader)?;
        if let Some(ordinal) = index.max_ordinal().filter(|&o| o >= doc_count) {
            return Err(PilumError::corrupt(format!(
                "numeric index '{}' references ordinal {ordinal} of {doc_count}",
                index.field()
            )));
        }
        if indexes.insert(index.field().to_string(), index).is_some() {
            return Err(PilumError::corrupt("duplicate numeric index field"));
        }
    }

    if !reader.is_eof() {
        return Err(PilumError::corrupt(format!(
            "{} trailing bytes after numeric region",
            reader.remaining()
        )));
    }
    Ok(indexes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> SegmentHeader {
        SegmentHeader {
            codec: CodecDescriptor::Compressing { block_size: 16 },
            doc_count: 42,
            stored: Region::new(56, 1000),
            numeric: Region::new(1056, 200),
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = sample_header().write().unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(bytes[6], CodecDescriptor::COMPRESSING_ID);
        assert_eq!(SegmentHeader::read(&bytes).unwrap(), sample_header());
    }

    #[test]
    fn test_header_corruption_detected() {
        let mut bytes = sample_header().write().unwrap();
        bytes[12] ^= 0x01;
        assert!(matches!(
            SegmentHeader::read(&bytes),
            Err(PilumError::CorruptData(_))
        ));

        let mut bytes = sample_header().write().unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            SegmentHeader::read(&bytes),
            Err(PilumError::CorruptData(_))
        ));

        assert!(SegmentHeader::read(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_validate_region_bounds() {
        let header = sample_header();
        assert!(header.validate(1256).is_ok());
        assert!(header.validate(1255).is_err());

        let overlapping = SegmentHeader {
            stored: Region::new(10, 5),
            ..header
        };
        assert!(overlapping.validate(1256).is_err());
    }

    #[test]
    fn test_numeric_region() {
        let indexes = vec![
            NumericIndex::build("foo", vec![(3, 0), (1, 1), (2, 2)]),
            NumericIndex::build("bar", vec![(-5, 2)]),
        ];
        let bytes = write_numeric_region(&indexes).unwrap();

        let decoded = read_numeric_region(&bytes, 3).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded["foo"], indexes[0]);
        assert_eq!(decoded["bar"], indexes[1]);

        assert!(matches!(
            read_numeric_region(&bytes, 2),
            Err(PilumError::CorruptData(_))
        ));
    }

    #[test]
    fn test_numeric_region_oversized_field_count() {
        let indexes = vec![NumericIndex::build("foo", vec![(1, 0)])];
        let mut bytes = write_numeric_region(&indexes).unwrap();
        bytes[..4].copy_from_slice(&u32::MAX.to_le_bytes());

        assert!(matches!(
            read_numeric_region(&bytes, 1),
            Err(PilumError::CorruptData(_))
        ));
    }
}
