//! Audio host error types

use thiserror::Error;

/// Failures opening or driving the host audio subsystem
///
/// All of these are fatal at startup: playback never begins without a stream.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio devices available
    #[error("No audio output devices found")]
    NoDevices,

    /// Host has no default output device
    #[error("Failed to get default audio device: {0}")]
    NoDefaultDevice(String),

    /// Configured device does not exist
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Device configuration could not be queried or satisfied
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// Device only offers sample formats we cannot write
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
