//! One supervised encoder run
//!
//! The job owns the encoder process for a single file. It gates reading on
//! the requested control value, forwards progress, and cleans up partial
//! output when the encode does not succeed.

use std::io::ErrorKind;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::JobControl;
use crate::engine::progress::ProgressParser;
use crate::ports::{EncodePort, EncodeProcess, EncodeRequest, ExitOutcome};

/// How long a terminated encoder may take to exit before it is killed
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// How one encode ended
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed,
    Failed { reason: String },
    Cancelled,
}

/// Receives job-level notifications while the encode runs
pub trait JobObserver: Send {
    /// Completion fraction in 0.0..=1.0, never decreasing
    fn on_progress(&mut self, fraction: f64);

    /// The pause gate closed
    fn on_paused(&mut self);

    /// The pause gate reopened
    fn on_resumed(&mut self);
}

/// Encoder invocation plus the duration its progress is measured against
#[derive(Debug, Clone)]
pub struct EncodeJob {
    request: EncodeRequest,
    duration: f64,
    stop_grace: Duration,
}

impl EncodeJob {
    pub fn new(request: EncodeRequest, duration: f64) -> Self {
        Self {
            request,
            duration,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    /// Time allowed between terminate and kill when cancelling
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub fn request(&self) -> &EncodeRequest {
        &self.request
    }

    /// Run the encode to completion, failure or cancellation.
    ///
    /// A `Stop` observed before spawning means the process is never started;
    /// a `Pause` observed before spawning holds the job at the gate first.
    /// A closed control channel counts as `Stop`.
    pub async fn run(
        &self,
        encoder: &dyn EncodePort,
        control: &mut watch::Receiver<JobControl>,
        observer: &mut dyn JobObserver,
    ) -> JobOutcome {
        let mut gate = Gate::default();
        if !gate.pass(control, observer).await {
            debug!("Stop requested before {} started", self.request.input.display());
            return JobOutcome::Cancelled;
        }

        let mut process = match encoder.spawn(&self.request).await {
            Ok(process) => process,
            Err(e) => {
                warn!("{}", e);
                return JobOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let mut reported = 0.0_f64;
        loop {
            let requested = *control.borrow_and_update();
            match requested {
                JobControl::Stop => return self.cancel(process).await,
                JobControl::Pause => {
                    if !gate.closed {
                        suspend(&mut *process);
                        gate.close(observer);
                    }
                    if control.changed().await.is_err() {
                        return self.cancel(process).await;
                    }
                    continue;
                }
                JobControl::Run => {
                    if gate.closed {
                        if let Err(e) = process.resume() {
                            log_control_error("resume", &e);
                        }
                        gate.open(observer);
                    }
                }
            }

            tokio::select! {
                biased;
                changed = control.changed() => {
                    if changed.is_err() {
                        return self.cancel(process).await;
                    }
                }
                line = process.next_line() => match line {
                    Some(line) => {
                        if let Some(fraction) = ProgressParser::fraction(&line, self.duration) {
                            if fraction > reported {
                                reported = fraction;
                                observer.on_progress(fraction);
                            }
                        }
                    }
                    None => break,
                },
            }
        }

        match process.wait().await {
            Ok(exit) if exit.success() => {
                info!("Encoded {}", self.request.output.display());
                JobOutcome::Completed
            }
            Ok(exit) => {
                let reason = match exit.code {
                    Some(code) => format!("encoder exited with code {}", code),
                    None => "encoder was killed by a signal".to_string(),
                };
                warn!("{} failed: {}", self.request.input.display(), reason);
                self.remove_partial_output().await;
                JobOutcome::Failed { reason }
            }
            Err(e) => {
                warn!("{}", e);
                self.remove_partial_output().await;
                JobOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn cancel(&self, mut process: Box<dyn EncodeProcess>) -> JobOutcome {
        info!("Cancelling encode of {}", self.request.input.display());
        if let Err(e) = process.terminate() {
            warn!("{}", e);
        }

        let exited = tokio::time::timeout(self.stop_grace, process.wait()).await;
        match exited {
            Ok(result) => log_cancelled_exit(result),
            Err(_) => {
                warn!(
                    "Encoder still running {:?} after terminate, killing it",
                    self.stop_grace
                );
                if let Err(e) = process.kill() {
                    warn!("{}", e);
                }
                let killed = tokio::time::timeout(self.stop_grace, process.wait()).await;
                match killed {
                    Ok(result) => log_cancelled_exit(result),
                    Err(_) => error!("Encoder did not exit after kill; abandoning it"),
                }
            }
        }

        self.remove_partial_output().await;
        JobOutcome::Cancelled
    }

    async fn remove_partial_output(&self) {
        match tokio::fs::remove_file(&self.request.output).await {
            Ok(()) => debug!("Removed partial output {}", self.request.output.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove partial output {}: {}",
                self.request.output.display(),
                e
            ),
        }
    }
}

/// Pause gate state shared by the pre-spawn wait and the read loop
#[derive(Debug, Default)]
struct Gate {
    closed: bool,
}

impl Gate {
    /// Wait until the control allows running. Returns false on stop.
    async fn pass(
        &mut self,
        control: &mut watch::Receiver<JobControl>,
        observer: &mut dyn JobObserver,
    ) -> bool {
        loop {
            let requested = *control.borrow_and_update();
            match requested {
                JobControl::Run => {
                    if self.closed {
                        self.open(observer);
                    }
                    return true;
                }
                JobControl::Stop => return false,
                JobControl::Pause => {
                    if !self.closed {
                        self.close(observer);
                    }
                    if control.changed().await.is_err() {
                        return false;
                    }
                }
            }
        }
    }

    fn close(&mut self, observer: &mut dyn JobObserver) {
        self.closed = true;
        observer.on_paused();
    }

    fn open(&mut self, observer: &mut dyn JobObserver) {
        self.closed = false;
        observer.on_resumed();
    }
}

fn log_cancelled_exit(result: Result<ExitOutcome, DomainError>) {
    match result {
        Ok(exit) => debug!("Cancelled encoder exited with {:?}", exit.code),
        Err(e) => warn!("{}", e),
    }
}

fn suspend(process: &mut dyn EncodeProcess) {
    if let Err(e) = process.pause() {
        log_control_error("pause", &e);
    }
}

fn log_control_error(action: &str, error: &DomainError) {
    match error {
        DomainError::Unsupported(_) => {
            warn!("Cannot {} the encoder on this platform; output reading is held instead", action)
        }
        other => warn!("Failed to {} the encoder: {}", action, other),
    }
}
