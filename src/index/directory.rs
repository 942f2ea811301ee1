//! Index directory and segment manifest.
//!
//! An index directory holds segment files named `seg_<generation>.plm` and a
//! `segments.json` manifest listing them in commit order. The manifest is
//! replaced atomically (write to a temporary file, then rename) so a reader
//! never observes a half-written list.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::codec::descriptor::CodecDescriptor;
use crate::error::{PilumError, Result};

/// Manifest file name inside an index directory.
pub const MANIFEST_FILE: &str = "segments.json";
/// Segment file extension.
pub const SEGMENT_EXTENSION: &str = "plm";

const MANIFEST_VERSION: u32 = 1;
const TEMP_EXTENSION: &str = "tmp";

/// Description of one finalized segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMeta {
    /// Segment name, e.g. `seg_1`.
    pub name: String,
    /// File name relative to the index directory.
    pub file: String,
    pub doc_count: u64,
    pub codec: CodecDescriptor,
    /// Integer fields with a numeric index, sorted.
    pub numeric_fields: Vec<String>,
}

/// Persisted list of segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    /// Generation the next segment will use.
    pub next_generation: u64,
    pub segments: Vec<SegmentMeta>,
}

impl Default for Manifest {
    fn default() -> Self {
        Manifest {
            version: MANIFEST_VERSION,
            next_generation: 1,
            segments: Vec::new(),
        }
    }
}

impl Manifest {
    /// The most recently committed segment.
    pub fn latest_segment(&self) -> Option<&SegmentMeta> {
        self.segments.last()
    }

    /// Total documents across all segments.
    pub fn total_docs(&self) -> u64 {
        self.segments.iter().map(|s| s.doc_count).sum()
    }
}

/// Segment name for a generation.
pub fn segment_name(generation: u64) -> String {
    format!("seg_{generation}")
}

/// A directory on the local file system holding one index.
#[derive(Debug, Clone)]
pub struct IndexDirectory {
    path: PathBuf,
}

impl IndexDirectory {
    /// Create the directory, wiping any segments and manifest already there.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        let directory = IndexDirectory { path };
        let removed = directory.wipe()?;
        if removed > 0 {
            info!(
                "Removed {removed} existing index files from {}",
                directory.path.display()
            );
        }
        directory.commit(&Manifest::default())?;
        Ok(directory)
    }

    /// Open an existing index directory; its manifest must exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let directory = IndexDirectory {
            path: path.as_ref().to_path_buf(),
        };
        if !directory.manifest_path().is_file() {
            return Err(PilumError::not_found(format!(
                "no {MANIFEST_FILE} in {}",
                directory.path.display()
            )));
        }
        Ok(directory)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(MANIFEST_FILE)
    }

    /// Absolute path of a segment file.
    pub fn segment_path(&self, meta: &SegmentMeta) -> PathBuf {
        self.path.join(&meta.file)
    }

    /// Path for a new segment of `generation` and its temporary sibling.
    pub fn segment_paths(&self, generation: u64) -> (String, PathBuf, PathBuf) {
        let file = format!("{}.{SEGMENT_EXTENSION}", segment_name(generation));
        let temp = self.path.join(format!("{file}.{TEMP_EXTENSION}"));
        (file.clone(), self.path.join(file), temp)
    }

    /// Read the manifest.
    pub fn load_manifest(&self) -> Result<Manifest> {
        let path = self.manifest_path();
        let bytes = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PilumError::not_found(format!("no manifest at {}", path.display()))
            } else {
                PilumError::Io(e)
            }
        })?;
        let manifest: Manifest = serde_json::from_slice(&bytes)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(PilumError::corrupt(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }
        Ok(manifest)
    }

    /// Atomically replace the manifest.
    pub fn commit(&self, manifest: &Manifest) -> Result<()> {
        let json = serde_json::to_string_pretty(manifest)?;
        let temp = self.path.join(format!("{MANIFEST_FILE}.{TEMP_EXTENSION}"));
        fs::write(&temp, json)?;
        fs::rename(&temp, self.manifest_path())?;
        debug!(
            "Committed manifest with {} segments to {}",
            manifest.segments.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Remove segment files, temporaries and the manifest. Returns the count.
    fn wipe(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let is_index_file = name == MANIFEST_FILE
                || (name.starts_with("seg_")
                    && (name.ends_with(&format!(".{SEGMENT_EXTENSION}"))
                        || name.ends_with(&format!(".{TEMP_EXTENSION}"))))
                || name == format!("{MANIFEST_FILE}.{TEMP_EXTENSION}");
            if is_index_file && entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Resolve a reader location to a segment file.
///
/// A directory resolves to the newest segment in its manifest; any other
/// existing path is taken as a segment file.
pub fn resolve_segment<P: AsRef<Path>>(location: P) -> Result<PathBuf> {
    let location = location.as_ref();
    if location.is_dir() {
        let directory = IndexDirectory::open(location)?;
        let manifest = directory.load_manifest()?;
        let latest = manifest.latest_segment().ok_or_else(|| {
            PilumError::not_found(format!("index at {} has no segments", location.display()))
        })?;
        return Ok(directory.segment_path(latest));
    }
    if location.exists() {
        return Ok(location.to_path_buf());
    }
    Err(PilumError::not_found(format!(
        "nothing at {}",
        location.display()
    )))
}
