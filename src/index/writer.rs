//! Segment writer.
//!
//! An [`IndexWriter`] buffers documents in memory and writes them out as one
//! immutable segment on [`finalize_segment`](IndexWriter::finalize_segment).
//! Its lifecycle is `Open -> Finalized -> Closed`, or `Open -> Closed` when
//! the buffered documents are abandoned.
//!
//! # Example
//!
//! ```no_run
//! use pilum::document::DocumentGenerator;
//! use pilum::index::writer::{IndexWriter, IndexWriterConfig};
//!
//! # fn main() -> pilum::error::Result<()> {
//! let mut writer = IndexWriter::open("tmp-codec", IndexWriterConfig::default())?;
//! for doc in DocumentGenerator::new(Some(7)).take(100) {
//!     writer.add_document(doc)?;
//! }
//! let meta = writer.finalize_segment()?;
//! writer.close()?;
//! assert_eq!(meta.doc_count, 100);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::codec::codec_for;
use crate::codec::descriptor::CodecDescriptor;
use crate::document::document::Document;
use crate::error::{PilumError, Result};
use crate::index::directory::{IndexDirectory, Manifest, SegmentMeta, segment_name};
use crate::index::numeric::NumericIndex;
use crate::index::segment::{HEADER_LEN, SegmentHeader, write_numeric_region};
use crate::storage::Region;
use crate::store::DocumentStore;

/// How an existing index location is treated on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenMode {
    /// Wipe existing segments and start an empty index.
    #[default]
    Create,
    /// Add a new segment to an existing index.
    Append,
}

/// Index writer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexWriterConfig {
    /// Stored-fields codec for the new segment.
    pub codec: CodecDescriptor,

    /// Create or append.
    pub open_mode: OpenMode,
}

/// Writer lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Open,
    Finalized,
    Closed,
}

/// Buffers documents and writes them as one segment.
#[derive(Debug)]
pub struct IndexWriter {
    directory: IndexDirectory,
    manifest: Manifest,
    store: DocumentStore,
    /// Integer values per field, as `(value, ordinal)`.
    numeric: BTreeMap<String, Vec<(i32, u64)>>,
    state: WriterState,
}

impl IndexWriter {
    /// Open a writer on the index directory at `path`.
    pub fn open<P: AsRef<Path>>(path: P, config: IndexWriterConfig) -> Result<Self> {
        let path = path.as_ref();
        let directory = match config.open_mode {
            OpenMode::Create => IndexDirectory::create(path)?,
            OpenMode::Append => IndexDirectory::open(path)?,
        };
        let manifest = directory.load_manifest()?;
        let store = DocumentStore::new(codec_for(config.codec)?);

        info!(
            "Opened index writer at {} ({:?}, codec {}, {} existing segments)",
            path.display(),
            config.open_mode,
            config.codec,
            manifest.segments.len()
        );

        Ok(IndexWriter {
            directory,
            manifest,
            store,
            numeric: BTreeMap::new(),
            state: WriterState::Open,
        })
    }

    fn check_open(&self, operation: &str) -> Result<()> {
        match self.state {
            WriterState::Open => Ok(()),
            WriterState::Finalized => Err(PilumError::invalid_state(format!(
                "cannot {operation}: segment already finalized"
            ))),
            WriterState::Closed => Err(PilumError::closed(format!(
                "cannot {operation}: writer is closed"
            ))),
        }
    }

    /// Buffer a document and return its ordinal.
    ///
    /// Every integer field value is recorded for the numeric index.
    pub fn add_document(&mut self, doc: Document) -> Result<u64> {
        self.check_open("add document")?;

        let ordinal = self.store.append(&doc)?;
        for (name, value) in doc.iter() {
            if let Some(value) = value.as_integer() {
                self.numeric
                    .entry(name.to_string())
                    .or_default()
                    .push((value, ordinal));
            }
        }
        Ok(ordinal)
    }

    /// Write the buffered documents as a new segment and commit it.
    ///
    /// The segment is written to a temporary file and renamed into place
    /// before the manifest is updated. On failure the writer stays open
    /// and keeps its buffer.
    pub fn finalize_segment(&mut self) -> Result<SegmentMeta> {
        match self.state {
            WriterState::Open => {}
            WriterState::Finalized => {
                return Err(PilumError::invalid_state("segment already finalized"));
            }
            WriterState::Closed => {
                return Err(PilumError::invalid_state("cannot finalize a closed writer"));
            }
        }

        let indexes: Vec<NumericIndex> = self
            .numeric
            .iter()
            .map(|(field, entries)| NumericIndex::build(field.as_str(), entries.clone()))
            .collect();
        let stored = self.store.write_region()?;
        let numeric = write_numeric_region(&indexes)?;

        let stored_region = Region::new(HEADER_LEN as u64, stored.len() as u64);
        let header = SegmentHeader {
            codec: self.store.descriptor(),
            doc_count: self.store.len(),
            stored: stored_region,
            numeric: Region::new(stored_region.offset + stored_region.len, numeric.len() as u64),
        };

        let generation = self.manifest.next_generation;
        let (file_name, path, temp) = self.directory.segment_paths(generation);
        {
            let mut out = BufWriter::new(File::create(&temp)?);
            out.write_all(&header.write()?)?;
            out.write_all(&stored)?;
            out.write_all(&numeric)?;
            out.flush()?;
            out.get_ref().sync_all()?;
        }
        fs::rename(&temp, &path)?;

        let meta = SegmentMeta {
            name: segment_name(generation),
            file: file_name,
            doc_count: header.doc_count,
            codec: header.codec,
            numeric_fields: self.numeric.keys().cloned().collect(),
        };
        let mut manifest = self.manifest.clone();
        manifest.segments.push(meta.clone());
        manifest.next_generation = generation + 1;
        self.directory.commit(&manifest)?;
        self.manifest = manifest;

        info!(
            "Finalized segment {} with {} documents ({} stored bytes, {} numeric fields)",
            meta.name,
            meta.doc_count,
            stored.len(),
            indexes.len()
        );

        self.store.clear();
        self.numeric.clear();
        self.state = WriterState::Finalized;
        Ok(meta)
    }

    /// Close the writer. Idempotent; unfinalized documents are discarded.
    pub fn close(&mut self) -> Result<()> {
        if self.state == WriterState::Open && !self.store.is_empty() {
            debug!(
                "Discarding {} unfinalized documents on close",
                self.store.len()
            );
        }
        self.store.clear();
        self.numeric.clear();
        self.state = WriterState::Closed;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.state == WriterState::Closed
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Number of documents buffered since open.
    pub fn pending_docs(&self) -> u64 {
        self.store.len()
    }

    pub fn directory(&self) -> &IndexDirectory {
        &self.directory
    }
}
