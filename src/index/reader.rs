//! Segment reader.
//!
//! An [`IndexReader`] opens one finalized segment and serves random-access
//! fetches, ordinal-order scans and numeric range queries. All operations
//! take `&self`, so one reader can be wrapped in an `Arc` and used from many
//! threads at once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::codec::{BlockCache, StoredFieldsReader};
use crate::document::document::Document;
use crate::error::{PilumError, Result};
use crate::index::directory::resolve_segment;
use crate::index::numeric::{NumericIndex, NumericRange};
use crate::index::segment::{HEADER_LEN, SegmentHeader, read_numeric_region};
use crate::storage::{AccessStrategy, SegmentData};

/// Descriptive information about an open segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    pub path: PathBuf,
    pub header: SegmentHeader,
    pub strategy: AccessStrategy,
    pub file_len: u64,
    /// Sorted names of the indexed integer fields.
    pub numeric_fields: Vec<String>,
}

#[derive(Debug)]
struct OpenSegment {
    path: PathBuf,
    header: SegmentHeader,
    data: Arc<SegmentData>,
    stored: StoredFieldsReader,
    numeric: HashMap<String, NumericIndex>,
}

impl OpenSegment {
    fn load(path: PathBuf, strategy: AccessStrategy) -> Result<Self> {
        let data = Arc::new(SegmentData::open(&path, strategy)?);

        let header = SegmentHeader::read(&data.read_at(0, HEADER_LEN)?)?;
        header.validate(data.len())?;

        let stored = StoredFieldsReader::open(
            header.codec,
            Arc::clone(&data),
            header.stored,
            header.doc_count,
        )?;
        let numeric_bytes = header.numeric.read(&data, 0, header.numeric.len as usize)?;
        let numeric = read_numeric_region(&numeric_bytes, header.doc_count)?;

        Ok(OpenSegment {
            path,
            header,
            data,
            stored,
            numeric,
        })
    }
}

/// Reader over one segment.
#[derive(Debug)]
pub struct IndexReader {
    segment: RwLock<Option<Arc<OpenSegment>>>,
}

impl IndexReader {
    /// Open a segment file, or the newest segment of an index directory.
    pub fn open<P: AsRef<Path>>(location: P, strategy: AccessStrategy) -> Result<Self> {
        let path = resolve_segment(location)?;
        let segment = OpenSegment::load(path, strategy)?;
        debug!(
            "Opened segment {} ({} docs, codec {}, {strategy})",
            segment.path.display(),
            segment.header.doc_count,
            segment.header.codec
        );

        Ok(IndexReader {
            segment: RwLock::new(Some(Arc::new(segment))),
        })
    }

    fn segment(&self) -> Result<Arc<OpenSegment>> {
        self.segment
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| PilumError::closed("reader is closed"))
    }

    /// Another reader over the same segment bytes.
    ///
    /// The two readers close independently.
    pub fn share(&self) -> Result<IndexReader> {
        Ok(IndexReader {
            segment: RwLock::new(Some(self.segment()?)),
        })
    }

    /// Number of documents in the segment.
    pub fn document_count(&self) -> Result<u64> {
        Ok(self.segment()?.header.doc_count)
    }

    /// Fetch the document at `ordinal`.
    pub fn fetch(&self, ordinal: u64) -> Result<Document> {
        let segment = self.segment()?;
        if ordinal >= segment.header.doc_count {
            return Err(PilumError::out_of_range(format!(
                "ordinal {ordinal} not in [0, {})",
                segment.header.doc_count
            )));
        }
        segment.stored.document(ordinal)
    }

    /// Iterate over every document in ordinal order.
    ///
    /// Each call starts a fresh scan. A scan keeps the segment alive on its
    /// own, so closing the reader does not cut it short.
    pub fn scan(&self) -> Result<Scan> {
        Ok(Scan {
            segment: self.segment()?,
            next: 0,
            cache: BlockCache::new(),
        })
    }

    /// Ordinals whose `field` value lies in `range`, in ascending value order.
    ///
    /// A field without a numeric index matches nothing.
    pub fn range_query(&self, field: &str, range: &NumericRange) -> Result<Vec<u64>> {
        let segment = self.segment()?;
        Ok(segment
            .numeric
            .get(field)
            .map(|index| index.range_query(range))
            .unwrap_or_default())
    }

    /// Release this reader's hold on the segment. Idempotent.
    pub fn close(&self) -> Result<()> {
        if let Some(segment) = self.segment.write().take() {
            debug!("Closed reader on {}", segment.path.display());
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.segment.read().is_none()
    }

    /// Header and file information of the open segment.
    pub fn meta(&self) -> Result<SegmentInfo> {
        let segment = self.segment()?;
        let mut numeric_fields: Vec<String> = segment.numeric.keys().cloned().collect();
        numeric_fields.sort();

        Ok(SegmentInfo {
            path: segment.path.clone(),
            header: segment.header,
            strategy: segment.data.strategy(),
            file_len: segment.data.len(),
            numeric_fields,
        })
    }
}

/// Lazy ordinal-order iterator returned by [`IndexReader::scan`].
#[derive(Debug)]
pub struct Scan {
    segment: Arc<OpenSegment>,
    next: u64,
    cache: BlockCache,
}

impl Iterator for Scan {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.segment.header.doc_count {
            return None;
        }
        let ordinal = self.next;
        self.next += 1;
        Some(self.segment.stored.document_cached(ordinal, &mut self.cache))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.segment.header.doc_count - self.next) as usize;
        (remaining, Some(remaining))
    }
}
