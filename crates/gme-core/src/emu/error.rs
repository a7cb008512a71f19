//! Emulator error types

use std::path::PathBuf;
use thiserror::Error;

use crate::container::ContainerError;

/// Errors raised by the decode collaborator and the session around it
#[derive(Error, Debug)]
pub enum EmuError {
    /// File could not be read
    #[error("{path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Data is not in any format we can open
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Data looked like a known format but could not be parsed
    #[error("Invalid file data: {0}")]
    InvalidData(String),

    /// Container table is malformed
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// Requested track does not exist; `clamped` is the nearest valid one
    #[error("there is no track {requested}; playing track {clamped} instead")]
    TrackOutOfRange {
        requested: i64,
        track_count: usize,
        clamped: usize,
    },

    /// The emulator cannot produce more samples
    #[error("Decode failed: {0}")]
    DecodeFailure(String),

    /// Track data is exhausted
    #[error("End of track data")]
    EndOfTrack,

    /// Emulator was opened for metadata only
    #[error("Emulator was opened for information only")]
    InfoOnly,
}

impl EmuError {
    /// Whether this error means the media could not be opened at all
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            EmuError::Open { .. }
                | EmuError::UnsupportedFormat(_)
                | EmuError::InvalidData(_)
                | EmuError::Container(_)
        )
    }

    /// Whether this error stops the producer (decode failure class)
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            EmuError::DecodeFailure(_) | EmuError::EndOfTrack | EmuError::InfoOnly
        )
    }
}

/// Result type for emulator operations
pub type EmuResult<T> = Result<T, EmuError>;
