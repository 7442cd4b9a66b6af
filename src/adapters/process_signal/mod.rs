//! OS process signalling for pause/resume/terminate

use crate::domain::errors::DomainError;

/// Signals the encoder supervision needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSignal {
    Suspend,
    Continue,
    Terminate,
}

impl ProcessSignal {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessSignal::Suspend => "SIGSTOP",
            ProcessSignal::Continue => "SIGCONT",
            ProcessSignal::Terminate => "SIGTERM",
        }
    }
}

/// Platform supports suspending and continuing a child process
pub fn supports_suspend() -> bool {
    cfg!(unix)
}

/// Deliver `signal` to process `pid`
#[cfg(unix)]
pub fn send_signal(pid: u32, signal: ProcessSignal) -> Result<(), DomainError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| DomainError::ProcessControl(format!("Invalid process id {}", pid)))?;
    let sig = match signal {
        ProcessSignal::Suspend => Signal::SIGSTOP,
        ProcessSignal::Continue => Signal::SIGCONT,
        ProcessSignal::Terminate => Signal::SIGTERM,
    };

    kill(Pid::from_raw(raw), sig).map_err(|errno| {
        DomainError::ProcessControl(format!(
            "Failed to send {} to process {}: {}",
            signal.name(),
            pid,
            errno
        ))
    })
}

/// Deliver `signal` to process `pid`
#[cfg(not(unix))]
pub fn send_signal(pid: u32, signal: ProcessSignal) -> Result<(), DomainError> {
    Err(DomainError::Unsupported(format!(
        "{} is not available on this platform (process {})",
        signal.name(),
        pid
    )))
}
