//! Recoder batch transcoding library
//!
//! Queues video files, converts each one to an edit-friendly intermediate
//! format through an external encoder, and exposes live progress together
//! with pause, resume and stop control over the running batch.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{AppContainer, BatchController, BatchSettings, DefaultAppContainer};
pub use domain::errors::DomainError;
pub use domain::model::{BatchEvent, BatchSnapshot, BatchState, FileItem, FileStatus};
pub use error::{RecodeError, RecodeResult};
