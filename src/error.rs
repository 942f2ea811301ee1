//! Error types for the Pilum library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`PilumError`] enum. The lifecycle and format variants map one-to-one to
//! the failure kinds a caller can act on; [`PilumError::kind`] exposes that
//! classification without matching on the message.
//!
//! # Examples
//!
//! ```
//! use pilum::error::{ErrorKind, PilumError, Result};
//!
//! fn fetch_past_end() -> Result<()> {
//!     Err(PilumError::out_of_range("ordinal 10 not in [0, 10)"))
//! }
//!
//! let err = fetch_past_end().unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::OutOfRange);
//! ```

use std::fmt;
use std::io;

use thiserror::Error;

/// The main error type for Pilum operations.
#[derive(Error, Debug)]
pub enum PilumError {
    /// I/O errors from the underlying file system.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operation attempted in the wrong writer or reader lifecycle state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Ordinal or bound outside the valid domain.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Header, codec or checksum mismatch while reading.
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// Segment or index location missing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation on a released reader or writer.
    #[error("Closed: {0}")]
    Closed(String),

    /// A benchmark worker ran past its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid caller-supplied argument or configuration.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization/deserialization errors (manifest, config, report).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with PilumError.
pub type Result<T> = std::result::Result<T, PilumError>;

/// Coarse classification of a [`PilumError`], used for CLI reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    InvalidState,
    OutOfRange,
    CorruptData,
    NotFound,
    Closed,
    Timeout,
    InvalidArgument,
    Json,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Io => "io",
            ErrorKind::InvalidState => "invalid-state",
            ErrorKind::OutOfRange => "out-of-range",
            ErrorKind::CorruptData => "corrupt-data",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Closed => "closed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidArgument => "invalid-argument",
            ErrorKind::Json => "json",
            ErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

impl PilumError {
    /// Create a new invalid state error.
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        PilumError::InvalidState(msg.into())
    }

    /// Create a new out of range error.
    pub fn out_of_range<S: Into<String>>(msg: S) -> Self {
        PilumError::OutOfRange(msg.into())
    }

    /// Create a new corrupt data error.
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        PilumError::CorruptData(msg.into())
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        PilumError::NotFound(msg.into())
    }

    /// Create a new closed error.
    pub fn closed<S: Into<String>>(msg: S) -> Self {
        PilumError::Closed(msg.into())
    }

    /// Create a new timeout error.
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        PilumError::Timeout(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        PilumError::InvalidArgument(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        PilumError::Other(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PilumError::Io(_) => ErrorKind::Io,
            PilumError::InvalidState(_) => ErrorKind::InvalidState,
            PilumError::OutOfRange(_) => ErrorKind::OutOfRange,
            PilumError::CorruptData(_) => ErrorKind::CorruptData,
            PilumError::NotFound(_) => ErrorKind::NotFound,
            PilumError::Closed(_) => ErrorKind::Closed,
            PilumError::Timeout(_) => ErrorKind::Timeout,
            PilumError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            PilumError::Json(_) => ErrorKind::Json,
            PilumError::Other(_) => ErrorKind::Other,
        }
    }
}
