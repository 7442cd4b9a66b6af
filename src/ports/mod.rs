// Ports - Interface definitions (contracts)

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe duration and first video stream geometry. Never fails: values
    /// the tool cannot provide come back as unknown.
    async fn probe(&self, path: &Path) -> ProbeReport;
}

/// Fully built encoder invocation for one file
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Arguments passed to the encoder binary, program name excluded
    pub args: Vec<OsString>,
}

/// How an encoder process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Exit code, `None` when the process died by signal
    pub code: Option<i32>,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Port for launching encoder processes
#[async_trait]
pub trait EncodePort: Send + Sync {
    /// Check that the encoder can be run at all
    async fn check_available(&self) -> Result<(), DomainError>;

    /// Spawn the encoder for one request
    async fn spawn(&self, request: &EncodeRequest) -> Result<Box<dyn EncodeProcess>, DomainError>;
}

/// OS-level control over a live child process.
///
/// Platforms without suspend/continue report `DomainError::Unsupported` from
/// `pause`/`resume`; callers degrade by simply not reading the process output.
pub trait ProcessControl: Send {
    /// Suspend the process
    fn pause(&mut self) -> Result<(), DomainError>;

    /// Continue a suspended process
    fn resume(&mut self) -> Result<(), DomainError>;

    /// Ask the process to terminate
    fn terminate(&mut self) -> Result<(), DomainError>;

    /// Force the process down when it ignores `terminate`
    fn kill(&mut self) -> Result<(), DomainError>;

    /// Process has not exited yet
    fn is_alive(&mut self) -> bool;
}

/// A running encoder: process control plus its diagnostic stream
#[async_trait]
pub trait EncodeProcess: ProcessControl {
    /// Next line of diagnostic output, `None` at end of stream.
    ///
    /// Must be cancel-safe: dropping the future loses no buffered output.
    async fn next_line(&mut self) -> Option<String>;

    /// Wait for the process to exit
    async fn wait(&mut self) -> Result<ExitOutcome, DomainError>;
}

/// Consumer of batch change events on the presentation side
pub trait BatchObserver: Send + Sync {
    fn on_event(&self, event: &BatchEvent);
}
