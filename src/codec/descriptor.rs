//! Codec descriptor persisted in every segment header.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PilumError, Result};

/// Identifies the stored-fields codec a segment was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CodecDescriptor {
    /// Length-prefixed documents behind an offset table.
    #[default]
    Plain,
    /// LZ4-compressed blocks of `block_size` consecutive documents.
    Compressing { block_size: u32 },
}

impl CodecDescriptor {
    /// Header id of [`CodecDescriptor::Plain`].
    pub const PLAIN_ID: u8 = 0;
    /// Header id of [`CodecDescriptor::Compressing`].
    pub const COMPRESSING_ID: u8 = 1;

    /// One-byte id written to the segment header.
    pub fn id(&self) -> u8 {
        match self {
            CodecDescriptor::Plain => Self::PLAIN_ID,
            CodecDescriptor::Compressing { .. } => Self::COMPRESSING_ID,
        }
    }

    /// Codec parameter written next to the id (block size, or 0).
    pub fn parameter(&self) -> u32 {
        match self {
            CodecDescriptor::Plain => 0,
            CodecDescriptor::Compressing { block_size } => *block_size,
        }
    }

    /// Rebuild a descriptor from the header id and parameter.
    pub fn from_parts(id: u8, parameter: u32) -> Result<Self> {
        match id {
            Self::PLAIN_ID => Ok(CodecDescriptor::Plain),
            Self::COMPRESSING_ID if parameter > 0 => Ok(CodecDescriptor::Compressing {
                block_size: parameter,
            }),
            Self::COMPRESSING_ID => Err(PilumError::corrupt(
                "compressing codec with zero block size",
            )),
            other => Err(PilumError::corrupt(format!("unknown codec id {other}"))),
        }
    }

    /// Short codec name.
    pub fn name(&self) -> &'static str {
        match self {
            CodecDescriptor::Plain => "plain",
            CodecDescriptor::Compressing { .. } => "compressing",
        }
    }
}

impl fmt::Display for CodecDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecDescriptor::Plain => f.write_str("plain"),
            CodecDescriptor::Compressing { block_size } => {
                write!(f, "compressing(block_size={block_size})")
            }
        }
    }
}
