//! Pluggable stored-fields codecs.
//!
//! A codec turns documents into bytes at two levels: one document at a time
//! ([`StoredFieldsCodec::encode`] / [`StoredFieldsCodec::decode`]), and a
//! whole segment's documents into a stored-fields region
//! ([`StoredFieldsCodec::write_region`]). Two variants exist:
//!
//! - [`plain::PlainCodec`]: offset table plus raw documents.
//! - [`compressing::CompressingCodec`]: LZ4-compressed blocks of consecutive
//!   documents with a per-block CRC32.
//!
//! The variant used is recorded as a [`CodecDescriptor`] in the segment
//! header, and [`StoredFieldsReader::open`] picks the decoder from it alone.
//!
//! # Example
//!
//! ```
//! use pilum::codec::{StoredFieldsCodec, codec_for};
//! use pilum::codec::descriptor::CodecDescriptor;
//! use pilum::document::document::Document;
//!
//! # fn main() -> pilum::error::Result<()> {
//! let codec = codec_for(CodecDescriptor::Compressing { block_size: 4 })?;
//! let doc = Document::builder().add_integer("foo", 7).build();
//! let bytes = codec.encode(&doc)?;
//! assert_eq!(codec.decode(&bytes)?, doc);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::document::document::Document;
use crate::error::Result;
use crate::storage::{Region, SegmentData};

pub mod compressing;
pub mod descriptor;
pub mod fields;
pub mod plain;

pub use compressing::{BlockCache, CompressingCodec, CompressingFieldsReader};
pub use descriptor::CodecDescriptor;
pub use plain::{PlainCodec, PlainFieldsReader};

/// Serializer for a document's stored field values.
pub trait StoredFieldsCodec: Send + Sync + fmt::Debug {
    /// Descriptor recorded in the segment header.
    fn descriptor(&self) -> CodecDescriptor;

    /// Serialize one document.
    fn encode(&self, doc: &Document) -> Result<Vec<u8>> {
        fields::encode_document(doc)
    }

    /// Deserialize one document produced by [`encode`](Self::encode).
    fn decode(&self, bytes: &[u8]) -> Result<Document> {
        fields::decode_document(bytes)
    }

    /// Lay out a segment's encoded documents, in ordinal order, as a
    /// stored-fields region.
    fn write_region(&self, docs: &[Vec<u8>]) -> Result<Vec<u8>>;
}

/// Build the codec described by `descriptor`.
pub fn codec_for(descriptor: CodecDescriptor) -> Result<Arc<dyn StoredFieldsCodec>> {
    let codec: Arc<dyn StoredFieldsCodec> = match descriptor {
        CodecDescriptor::Plain => Arc::new(PlainCodec::new()),
        CodecDescriptor::Compressing { block_size } => Arc::new(CompressingCodec::new(block_size)?),
    };
    Ok(codec)
}

/// Reader over a stored-fields region, selected by the segment's descriptor.
#[derive(Debug)]
pub enum StoredFieldsReader {
    Plain(PlainFieldsReader),
    Compressing(CompressingFieldsReader),
}

impl StoredFieldsReader {
    /// Open the region of `data` written with `descriptor`.
    pub fn open(
        descriptor: CodecDescriptor,
        data: Arc<SegmentData>,
        region: Region,
        doc_count: u64,
    ) -> Result<Self> {
        let reader = match descriptor {
            CodecDescriptor::Plain => {
                StoredFieldsReader::Plain(PlainFieldsReader::open(data, region, doc_count)?)
            }
            CodecDescriptor::Compressing { block_size } => StoredFieldsReader::Compressing(
                CompressingFieldsReader::open(data, region, doc_count, block_size)?,
            ),
        };
        Ok(reader)
    }

    /// Random-access fetch of one document.
    pub fn document(&self, ordinal: u64) -> Result<Document> {
        match self {
            StoredFieldsReader::Plain(reader) => reader.document(ordinal),
            StoredFieldsReader::Compressing(reader) => reader.document(ordinal),
        }
    }

    /// Fetch with a caller-owned block cache, for sequential access.
    pub fn document_cached(&self, ordinal: u64, cache: &mut BlockCache) -> Result<Document> {
        match self {
            StoredFieldsReader::Plain(reader) => reader.document(ordinal),
            StoredFieldsReader::Compressing(reader) => reader.document_cached(ordinal, cache),
        }
    }
}
