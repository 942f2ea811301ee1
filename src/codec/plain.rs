//! Uncompressed stored-fields codec.
//!
//! Region layout:
//!
//! ```text
//! (doc_count + 1) × u64 LE   offsets into the data section
//! data section               concatenated encoded documents
//! ```

use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};

use crate::codec::StoredFieldsCodec;
use crate::codec::descriptor::CodecDescriptor;
use crate::codec::fields::decode_document;
use crate::document::document::Document;
use crate::error::{PilumError, Result};
use crate::storage::structured::StructWriter;
use crate::storage::{Region, SegmentData};

/// Length-prefixed documents behind an offset table; no compression.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl PlainCodec {
    pub fn new() -> Self {
        PlainCodec
    }
}

impl StoredFieldsCodec for PlainCodec {
    fn descriptor(&self) -> CodecDescriptor {
        CodecDescriptor::Plain
    }

    fn write_region(&self, docs: &[Vec<u8>]) -> Result<Vec<u8>> {
        let data_len: usize = docs.iter().map(Vec::len).sum();
        let mut writer = StructWriter::with_capacity((docs.len() + 1) * 8 + data_len);

        let mut offset = 0u64;
        writer.write_u64(offset)?;
        for doc in docs {
            offset += doc.len() as u64;
            writer.write_u64(offset)?;
        }
        for doc in docs {
            writer.write_raw(doc)?;
        }

        Ok(writer.into_inner())
    }
}

/// Random-access reader over a plain stored-fields region.
#[derive(Debug)]
pub struct PlainFieldsReader {
    data: Arc<SegmentData>,
    region: Region,
    doc_count: u64,
    /// Start of the data section, relative to the region.
    data_start: u64,
}

impl PlainFieldsReader {
    /// Validate the offset table bounds and build the reader.
    pub fn open(data: Arc<SegmentData>, region: Region, doc_count: u64) -> Result<Self> {
        let data_start = doc_count
            .checked_add(1)
            .and_then(|n| n.checked_mul(8))
            .filter(|&table_len| table_len <= region.len)
            .ok_or_else(|| {
                PilumError::corrupt(format!(
                    "offset table for {doc_count} documents exceeds region of {} bytes",
                    region.len
                ))
            })?;

        let last = region.read(&data, doc_count * 8, 8)?;
        let data_len = LittleEndian::read_u64(&last);
        if data_start.checked_add(data_len) != Some(region.len) {
            return Err(PilumError::corrupt(format!(
                "plain region length mismatch: table says {data_len} data bytes, region has {}",
                region.len - data_start
            )));
        }

        Ok(PlainFieldsReader {
            data,
            region,
            doc_count,
            data_start,
        })
    }

    /// Decode the document at `ordinal`.
    pub fn document(&self, ordinal: u64) -> Result<Document> {
        if ordinal >= self.doc_count {
            return Err(PilumError::out_of_range(format!(
                "ordinal {ordinal} not in [0, {})",
                self.doc_count
            )));
        }

        let entry = self.region.read(&self.data, ordinal * 8, 16)?;
        let start = LittleEndian::read_u64(&entry[..8]);
        let end = LittleEndian::read_u64(&entry[8..]);
        if start > end {
            return Err(PilumError::corrupt(format!(
                "document {ordinal} has inverted offsets {start}..{end}"
            )));
        }

        let bytes = self
            .region
            .read(&self.data, self.data_start + start, (end - start) as usize)?;
        decode_document(&bytes)
    }
}
