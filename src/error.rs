use std::path::PathBuf;
use thiserror::Error;

use crate::bitio::Mode;

pub type Result<T> = std::result::Result<T, HuffError>;

/// Coarse classification of a [`HuffError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller handed in something malformed: a bit that isn't 0 or 1, an unknown mode, a
    /// symbol the code table doesn't know about.
    InvalidArgument,
    /// The underlying storage could not be opened, read or written.
    ResourceUnavailable,
    /// The compressed data itself is malformed.
    CorruptStream,
}

#[derive(Debug, Error)]
pub enum HuffError {
    #[error("invalid bit value {0}, expected 0 or 1")]
    InvalidBit(u8),

    #[error("invalid stream mode {0:?}, expected \"r\" or \"w\"")]
    InvalidMode(String),

    #[error("cannot {operation} on a stream opened in {mode} mode")]
    WrongDirection { operation: &'static str, mode: Mode },

    #[error("node with zero frequency cannot enter the forest (symbol: {symbol:?})")]
    ZeroFrequency { symbol: Option<u8> },

    #[error("symbol {0:#04x} has no code in this table")]
    UnknownSymbol(u8),

    #[error("combined frequency overflows a 64-bit counter")]
    FrequencyOverflow,

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stream is empty, missing its trailer byte")]
    MissingTrailer,

    #[error("invalid trailer byte {trailer} for a stream with {data_len} data bytes")]
    InvalidTrailer { trailer: u8, data_len: u64 },

    #[error("stream ended in the middle of a code after {bits_read} bits")]
    CorruptStream { bits_read: u64 },
}

impl HuffError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HuffError::InvalidBit(_)
            | HuffError::InvalidMode(_)
            | HuffError::WrongDirection { .. }
            | HuffError::ZeroFrequency { .. }
            | HuffError::UnknownSymbol(_)
            | HuffError::FrequencyOverflow => ErrorKind::InvalidArgument,
            HuffError::Open { .. } | HuffError::Io(_) | HuffError::MissingTrailer => {
                ErrorKind::ResourceUnavailable
            }
            HuffError::InvalidTrailer { .. } | HuffError::CorruptStream { .. } => {
                ErrorKind::CorruptStream
            }
        }
    }
}
