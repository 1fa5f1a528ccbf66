//! Error types for Cadence.

use std::path::PathBuf;

use thiserror::Error;

use crate::ids::ClipId;

/// Top-level error type for Cadence operations.
#[derive(Debug, Error)]
pub enum CadenceError {
    /// Audio device and clip errors
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Preference storage errors
    #[error("Preferences error: {0}")]
    Preferences(#[from] PreferencesError),
}

/// Audio device and clip errors.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Failed to initialize the output device.
    #[error("Failed to initialize audio device: {0}")]
    DeviceInitFailed(String),

    /// Failed to create a playback sink.
    #[error("Failed to create audio sink: {0}")]
    SinkCreationFailed(String),

    /// Failed to load an audio file.
    #[error("Failed to load audio file '{path}': {message}")]
    LoadFailed {
        /// Path to the file that failed to load.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to decode audio data.
    #[error("Failed to decode audio: {0}")]
    DecodeFailed(String),

    /// Every voice is busy.
    #[error("No free audio voices available (max: {max})")]
    NoFreeVoices {
        /// Maximum number of voices.
        max: usize,
    },

    /// The clip was never loaded into this backend.
    #[error("Unknown clip: {0}")]
    UnknownClip(ClipId),
}

/// Preference storage errors.
#[derive(Debug, Error)]
pub enum PreferencesError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),
}

/// Result type alias for Cadence operations.
pub type CadenceResult<T> = Result<T, CadenceError>;

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Result type for preference operations.
pub type PreferencesResult<T> = Result<T, PreferencesError>;
