//! Append-only document store used while a segment is being written.

use std::sync::Arc;

use crate::codec::StoredFieldsCodec;
use crate::codec::descriptor::CodecDescriptor;
use crate::document::document::Document;
use crate::error::Result;

/// Pending encoded documents plus the codec that will lay them out.
///
/// Ordinals are assigned densely in append order. Everything stays in
/// memory until [`write_region`](Self::write_region) is called.
#[derive(Debug)]
pub struct DocumentStore {
    codec: Arc<dyn StoredFieldsCodec>,
    docs: Vec<Vec<u8>>,
    encoded_bytes: u64,
}

impl DocumentStore {
    pub fn new(codec: Arc<dyn StoredFieldsCodec>) -> Self {
        DocumentStore {
            codec,
            docs: Vec::new(),
            encoded_bytes: 0,
        }
    }

    /// Encode `doc` and return its ordinal.
    pub fn append(&mut self, doc: &Document) -> Result<u64> {
        let encoded = self.codec.encode(doc)?;
        self.encoded_bytes += encoded.len() as u64;
        self.docs.push(encoded);
        Ok(self.docs.len() as u64 - 1)
    }

    /// Number of documents appended so far.
    pub fn len(&self) -> u64 {
        self.docs.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Total encoded size before region layout.
    pub fn encoded_bytes(&self) -> u64 {
        self.encoded_bytes
    }

    pub fn descriptor(&self) -> CodecDescriptor {
        self.codec.descriptor()
    }

    /// Lay out every pending document as a stored-fields region.
    pub fn write_region(&self) -> Result<Vec<u8>> {
        self.codec.write_region(&self.docs)
    }

    /// Drop all pending documents.
    pub fn clear(&mut self) {
        self.docs.clear();
        self.encoded_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::codec_for;

    #[test]
    fn test_ordinals_are_dense() {
        let mut store = DocumentStore::new(codec_for(CodecDescriptor::Plain).unwrap());
        let doc = Document::builder().add_integer("foo", 1).build();

        assert_eq!(store.append(&doc).unwrap(), 0);
        assert_eq!(store.append(&doc).unwrap(), 1);
        assert_eq!(store.append(&doc).unwrap(), 2);
        assert_eq!(store.len(), 3);
        assert!(store.encoded_bytes() > 0);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.encoded_bytes(), 0);
    }

    #[test]
    fn test_descriptor_follows_codec() {
        let descriptor = CodecDescriptor::Compressing { block_size: 4 };
        let store = DocumentStore::new(codec_for(descriptor).unwrap());
        assert_eq!(store.descriptor(), descriptor);
    }
}
