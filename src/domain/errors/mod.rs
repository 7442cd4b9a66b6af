// Domain errors - Error types for the domain layer

use std::fmt;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// Requested state change is not allowed from the current state
    InvalidTransition { from: String, action: String },
    /// External tool could not be started
    SpawnFailed(String),
    /// Signal delivery to a child process failed
    ProcessControl(String),
    /// Capability not available on this platform
    Unsupported(String),
    /// Processing error
    ProcessingError(String),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::InvalidTransition { from, action } => {
                write!(f, "Cannot {} while batch is {}", action, from)
            }
            DomainError::SpawnFailed(msg) => write!(f, "Failed to start process: {}", msg),
            DomainError::ProcessControl(msg) => write!(f, "Process control failed: {}", msg),
            DomainError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            DomainError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
