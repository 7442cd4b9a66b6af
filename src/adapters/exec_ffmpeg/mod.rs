//! FFmpeg execution adapter
//!
//! Spawns the encoder as a child process, exposes its diagnostic stream as
//! lines and maps pause/resume/terminate onto process signals.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, Command};
use tracing::{debug, info, warn};

use crate::adapters::process_signal::{send_signal, ProcessSignal};
use crate::domain::errors::*;
use crate::ports::*;

const READ_CHUNK: usize = 4096;

/// FFmpeg-based execution adapter
pub struct FfmpegAdapter {
    program: PathBuf,
}

impl FfmpegAdapter {
    /// Create adapter for the given encoder binary
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

#[async_trait]
impl EncodePort for FfmpegAdapter {
    async fn check_available(&self) -> Result<(), DomainError> {
        let status = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| {
                DomainError::SpawnFailed(format!(
                    "Encoder '{}' is not available: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(DomainError::SpawnFailed(format!(
                "Encoder '{}' failed its version check ({})",
                self.program.display(),
                status
            )))
        }
    }

    async fn spawn(&self, request: &EncodeRequest) -> Result<Box<dyn EncodeProcess>, DomainError> {
        debug!(
            "Spawning {} {:?}",
            self.program.display(),
            request.args
        );

        let mut child = Command::new(&self.program)
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DomainError::SpawnFailed(format!(
                    "Failed to start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        let stderr = child.stderr.take();
        info!(
            "Encoder started (pid {:?}) for {}",
            child.id(),
            request.input.display()
        );

        Ok(Box::new(FfmpegProcess::new(child, stderr)))
    }
}

/// Live encoder child process
pub struct FfmpegProcess {
    child: Child,
    stderr: Option<ChildStderr>,
    splitter: LineSplitter,
}

impl FfmpegProcess {
    fn new(child: Child, stderr: Option<ChildStderr>) -> Self {
        Self {
            child,
            stderr,
            splitter: LineSplitter::default(),
        }
    }

    fn signal(&mut self, signal: ProcessSignal) -> Result<(), DomainError> {
        match self.child.id() {
            Some(pid) => send_signal(pid, signal),
            // Already reaped
            None => Ok(()),
        }
    }
}

impl ProcessControl for FfmpegProcess {
    fn pause(&mut self) -> Result<(), DomainError> {
        self.signal(ProcessSignal::Suspend)
    }

    fn resume(&mut self) -> Result<(), DomainError> {
        self.signal(ProcessSignal::Continue)
    }

    fn terminate(&mut self) -> Result<(), DomainError> {
        match self.signal(ProcessSignal::Terminate) {
            Ok(()) => {
                // A suspended child only acts on SIGTERM once continued
                if let Err(e) = self.signal(ProcessSignal::Continue) {
                    debug!("Continue after terminate failed: {}", e);
                }
                Ok(())
            }
            Err(e) => {
                warn!("{}; killing encoder instead", e);
                self.kill()
            }
        }
    }

    fn kill(&mut self) -> Result<(), DomainError> {
        self.child
            .start_kill()
            .map_err(|e| DomainError::ProcessControl(format!("Failed to kill encoder: {}", e)))
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

#[async_trait]
impl EncodeProcess for FfmpegProcess {
    async fn next_line(&mut self) -> Option<String> {
        loop {
            if let Some(line) = self.splitter.pop() {
                return Some(line);
            }

            let stderr = match self.stderr.as_mut() {
                Some(stderr) => stderr,
                None => return self.splitter.finish(),
            };

            let mut chunk = [0u8; READ_CHUNK];
            let read = stderr.read(&mut chunk).await;
            match read {
                Ok(0) => {
                    self.stderr = None;
                }
                Ok(n) => self.splitter.push(&chunk[..n]),
                Err(e) => {
                    warn!("Failed reading encoder output: {}", e);
                    self.stderr = None;
                }
            }
        }
    }

    async fn wait(&mut self) -> Result<ExitOutcome, DomainError> {
        // Unread output must not block the child on a full pipe
        self.stderr = None;
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| DomainError::ProcessingError(format!("Failed to wait for encoder: {}", e)))?;
        debug!("Encoder exited with {}", status);
        Ok(ExitOutcome {
            code: status.code(),
        })
    }
}

/// Splits a byte stream into lines on both `\n` and `\r`, dropping empties
#[derive(Debug, Default)]
struct LineSplitter {
    partial: Vec<u8>,
    ready: VecDeque<String>,
}

impl LineSplitter {
    fn push(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if byte == b'\n' || byte == b'\r' {
                self.flush_partial();
            } else {
                self.partial.push(byte);
            }
        }
    }

    fn pop(&mut self) -> Option<String> {
        self.ready.pop_front()
    }

    /// Drain whatever remains once the stream has ended
    fn finish(&mut self) -> Option<String> {
        self.flush_partial();
        self.ready.pop_front()
    }

    fn flush_partial(&mut self) {
        if !self.partial.is_empty() {
            let line = String::from_utf8_lossy(&self.partial).to_string();
            self.ready.push_back(line);
            self.partial.clear();
        }
    }
}
