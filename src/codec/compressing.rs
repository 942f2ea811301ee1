//! Block-compressing stored-fields codec.
//!
//! Consecutive documents are grouped into blocks of `block_size`, and each
//! block is compressed with LZ4 as a unit. Region layout:
//!
//! ```text
//! u32 LE block_size
//! u64 LE block_count
//! (block_count + 1) × u64 LE   block offsets, relative to the first block
//! blocks:  u32 LE crc32(compressed) | lz4 size-prepended payload
//!
//! payload: u32 n | (n + 1) × u32 doc offsets | concatenated documents
//! ```
//!
//! Fetching one document decompresses its whole block, so readers keep the
//! last decompressed block around.

use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use parking_lot::Mutex;

use crate::codec::StoredFieldsCodec;
use crate::codec::descriptor::CodecDescriptor;
use crate::codec::fields::decode_document;
use crate::document::document::Document;
use crate::error::{PilumError, Result};
use crate::storage::structured::{StructReader, StructWriter};
use crate::storage::{Region, SegmentData};

/// Default number of documents per compressed block.
pub const DEFAULT_BLOCK_SIZE: u32 = 128;

const REGION_HEADER_LEN: u64 = 4 + 8;

/// Stored-fields codec compressing fixed-size blocks of documents.
#[derive(Debug, Clone, Copy)]
pub struct CompressingCodec {
    block_size: u32,
}

impl CompressingCodec {
    /// Create a codec grouping `block_size` documents per block.
    pub fn new(block_size: u32) -> Result<Self> {
        if block_size == 0 {
            return Err(PilumError::invalid_argument(
                "compressing codec block size must be positive",
            ));
        }
        Ok(CompressingCodec { block_size })
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    fn compress_block(docs: &[Vec<u8>]) -> Result<Vec<u8>> {
        let data_len: usize = docs.iter().map(Vec::len).sum();
        let mut payload = StructWriter::with_capacity(4 + (docs.len() + 1) * 4 + data_len);

        payload.write_u32(docs.len() as u32)?;
        let mut offset = 0u32;
        payload.write_u32(offset)?;
        for doc in docs {
            offset = u32::try_from(doc.len())
                .ok()
                .and_then(|len| offset.checked_add(len))
                .ok_or_else(|| PilumError::invalid_argument("compressed block exceeds 4 GiB"))?;
            payload.write_u32(offset)?;
        }
        for doc in docs {
            payload.write_raw(doc)?;
        }

        let compressed = compress_prepend_size(&payload.into_inner());
        let mut block = StructWriter::with_capacity(4 + compressed.len());
        block.write_u32(crc32fast::hash(&compressed))?;
        block.write_raw(&compressed)?;
        Ok(block.into_inner())
    }
}

impl Default for CompressingCodec {
    fn default() -> Self {
        CompressingCodec {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl StoredFieldsCodec for CompressingCodec {
    fn descriptor(&self) -> CodecDescriptor {
        CodecDescriptor::Compressing {
            block_size: self.block_size,
        }
    }

    fn write_region(&self, docs: &[Vec<u8>]) -> Result<Vec<u8>> {
        let blocks = docs
            .chunks(self.block_size as usize)
            .map(Self::compress_block)
            .collect::<Result<Vec<_>>>()?;

        let blocks_len: usize = blocks.iter().map(Vec::len).sum();
        let mut writer =
            StructWriter::with_capacity(REGION_HEADER_LEN as usize + (blocks.len() + 1) * 8 + blocks_len);
        writer.write_u32(self.block_size)?;
        writer.write_u64(blocks.len() as u64)?;

        let mut offset = 0u64;
        writer.write_u64(offset)?;
        for block in &blocks {
            offset += block.len() as u64;
            writer.write_u64(offset)?;
        }
        for block in &blocks {
            writer.write_raw(block)?;
        }

        Ok(writer.into_inner())
    }
}

/// One decompressed block.
#[derive(Debug)]
pub struct DecodedBlock {
    index: u64,
    offsets: Vec<u32>,
    payload: Vec<u8>,
    data_start: usize,
}

impl DecodedBlock {
    fn parse(index: u64, payload: Vec<u8>, expected_docs: u64) -> Result<Self> {
        let mut reader = StructReader::new(&payload);
        let count = reader.read_u32()? as u64;
        if count != expected_docs {
            return Err(PilumError::corrupt(format!(
                "block {index} holds {count} documents, expected {expected_docs}"
            )));
        }

        let mut offsets = Vec::with_capacity(count as usize + 1);
        for _ in 0..=count {
            offsets.push(reader.read_u32()?);
        }
        let data_start = reader.position();

        let data_len = payload.len() - data_start;
        let monotonic = offsets.windows(2).all(|w| w[0] <= w[1]);
        if !monotonic || offsets.last().copied() != Some(data_len as u32) {
            return Err(PilumError::corrupt(format!(
                "block {index} has an invalid document offset table"
            )));
        }

        Ok(DecodedBlock {
            index,
            offsets,
            payload,
            data_start,
        })
    }

    /// Block number within the region.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Number of documents in the block.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the `local`-th document of the block.
    pub fn document(&self, local: usize) -> Result<Document> {
        if local >= self.len() {
            return Err(PilumError::out_of_range(format!(
                "document {local} not in block {} of {} documents",
                self.index,
                self.len()
            )));
        }
        let start = self.data_start + self.offsets[local] as usize;
        let end = self.data_start + self.offsets[local + 1] as usize;
        decode_document(&self.payload[start..end])
    }
}

/// Per-caller cache of the last decompressed block, used by scans.
#[derive(Debug, Default)]
pub struct BlockCache {
    block: Option<Arc<DecodedBlock>>,
}

impl BlockCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, index: u64) -> Option<Arc<DecodedBlock>> {
        self.block
            .as_ref()
            .filter(|block| block.index == index)
            .cloned()
    }
}

/// Random-access reader over a compressing stored-fields region.
#[derive(Debug)]
pub struct CompressingFieldsReader {
    data: Arc<SegmentData>,
    region: Region,
    doc_count: u64,
    block_size: u64,
    block_count: u64,
    /// Start of the first block, relative to the region.
    blocks_start: u64,
    /// Last block decompressed by `document`.
    last_block: Mutex<BlockCache>,
}

impl CompressingFieldsReader {
    /// Validate the region header and block table bounds.
    pub fn open(
        data: Arc<SegmentData>,
        region: Region,
        doc_count: u64,
        block_size: u32,
    ) -> Result<Self> {
        let header = region.read(&data, 0, REGION_HEADER_LEN as usize)?;
        let mut reader = StructReader::new(&header);
        let stored_block_size = reader.read_u32()?;
        let block_count = reader.read_u64()?;

        if stored_block_size != block_size {
            return Err(PilumError::corrupt(format!(
                "region block size {stored_block_size} does not match header block size {block_size}"
            )));
        }
        let expected_blocks = doc_count.div_ceil(block_size as u64);
        if block_count != expected_blocks {
            return Err(PilumError::corrupt(format!(
                "region has {block_count} blocks, {doc_count} documents need {expected_blocks}"
            )));
        }

        let blocks_start = (block_count + 1)
            .checked_mul(8)
            .and_then(|table| table.checked_add(REGION_HEADER_LEN))
            .filter(|&start| start <= region.len)
            .ok_or_else(|| PilumError::corrupt("block offset table exceeds region"))?;

        let last = region.read(&data, REGION_HEADER_LEN + block_count * 8, 8)?;
        if blocks_start.checked_add(LittleEndian::read_u64(&last)) != Some(region.len) {
            return Err(PilumError::corrupt("block offset table does not cover region"));
        }

        Ok(CompressingFieldsReader {
            data,
            region,
            doc_count,
            block_size: block_size as u64,
            block_count,
            blocks_start,
            last_block: Mutex::new(BlockCache::new()),
        })
    }

    fn load_block(&self, index: u64) -> Result<Arc<DecodedBlock>> {
        let entry = self
            .region
            .read(&self.data, REGION_HEADER_LEN + index * 8, 16)?;
        let start = LittleEndian::read_u64(&entry[..8]);
        let end = LittleEndian::read_u64(&entry[8..]);
        if start > end || end - start < 4 {
            return Err(PilumError::corrupt(format!(
                "block {index} has invalid offsets {start}..{end}"
            )));
        }

        let bytes = self
            .region
            .read(&self.data, self.blocks_start + start, (end - start) as usize)?;
        let stored_crc = LittleEndian::read_u32(&bytes[..4]);
        let compressed = &bytes[4..];
        let actual_crc = crc32fast::hash(compressed);
        if stored_crc != actual_crc {
            return Err(PilumError::corrupt(format!(
                "block {index} checksum mismatch: stored {stored_crc:08x}, computed {actual_crc:08x}"
            )));
        }

        let payload = decompress_size_prepended(compressed)
            .map_err(|e| PilumError::corrupt(format!("block {index} failed to decompress: {e}")))?;

        let first = index * self.block_size;
        let expected = (self.doc_count - first).min(self.block_size);
        DecodedBlock::parse(index, payload, expected).map(Arc::new)
    }

    fn check_ordinal(&self, ordinal: u64) -> Result<()> {
        if ordinal >= self.doc_count {
            return Err(PilumError::out_of_range(format!(
                "ordinal {ordinal} not in [0, {})",
                self.doc_count
            )));
        }
        Ok(())
    }

    /// Decode the document at `ordinal`, using the reader-wide block cache.
    ///
    /// The cache lock is never held while a block is read or decompressed.
    pub fn document(&self, ordinal: u64) -> Result<Document> {
        self.check_ordinal(ordinal)?;
        let index = ordinal / self.block_size;

        let cached = self.last_block.lock().get(index);
        let block = match cached {
            Some(block) => block,
            None => {
                let block = self.load_block(index)?;
                self.last_block.lock().block = Some(Arc::clone(&block));
                block
            }
        };
        block.document((ordinal % self.block_size) as usize)
    }

    /// Decode the document at `ordinal` using a caller-owned cache.
    pub fn document_cached(&self, ordinal: u64, cache: &mut BlockCache) -> Result<Document> {
        self.check_ordinal(ordinal)?;
        let index = ordinal / self.block_size;

        let block = match cache.get(index) {
            Some(block) => block,
            None => {
                let block = self.load_block(index)?;
                cache.block = Some(Arc::clone(&block));
                block
            }
        };
        block.document((ordinal % self.block_size) as usize)
    }

    /// Number of compressed blocks.
    pub fn block_count(&self) -> u64 {
        self.block_count
    }
}
