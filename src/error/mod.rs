//! Error handling module for Recoder

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for Recoder operations
#[derive(Error, Debug)]
pub enum RecodeError {
    /// Input path not found or inaccessible
    #[error("Input not found: {path}")]
    InputNotFound { path: String },

    /// None of the inputs resolved to a supported media file
    #[error("No supported media files found (expected .mp4, .mov, .mkv or .avi)")]
    NoMediaFiles,

    /// Encoder binary could not be run
    #[error("Encoder not available: {message}")]
    EncoderUnavailable { message: String },

    /// Configuration file could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Configuration file is not valid TOML
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Domain error bubbled up from the controller or a port
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for Recoder operations
pub type RecodeResult<T> = std::result::Result<T, RecodeError>;
