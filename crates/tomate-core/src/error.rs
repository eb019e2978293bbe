//! Core error types for tomate-core.
//!
//! Ordinary sequencing attempts never produce an error: a declined start or an
//! out-of-phase command is a no-op. Errors are reserved for invalid
//! configuration and for the audio capability.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for tomate-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
///
/// Raised before any engine state is touched, so a failed rebuild leaves the
/// previous chain fully intact.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Cycle count below one
    #[error("Invalid cycle count {0}: at least one pomodoro is required")]
    InvalidCycleCount(u32),

    /// Non-positive slot duration
    #[error("Invalid duration for '{slot}': {seconds} seconds (must be positive)")]
    InvalidDuration { slot: String, seconds: u64 },

    /// Slot id not present in the current chain
    #[error("Unknown slot: {0}")]
    UnknownSlot(String),

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Dotted key does not name a config field
    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    /// Value could not be converted to the field's type
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Audio capability errors. Never fatal to the timer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// No output device or sound resource could not be loaded
    #[error("Audio unavailable: {0}")]
    Unavailable(String),

    /// Playback request was rejected by the backend
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
