//! Scripted in-memory adapters
//!
//! Test support only. Stand-ins for the prober and encoder that replay canned
//! output, used by the unit tests and the integration suite;
//! `DefaultAppContainer::new` never builds them.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Probe adapter answering from a fixed table
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    reports: HashMap<String, ProbeReport>,
    fallback: ProbeReport,
    delay: Duration,
}

impl ScriptedProbe {
    /// Probe that knows nothing about any file
    pub fn new() -> Self {
        Self::default()
    }

    /// Report for any file not explicitly registered
    pub fn with_fallback(mut self, report: ProbeReport) -> Self {
        self.fallback = report;
        self
    }

    /// Register a report by file name
    pub fn with_report(mut self, file_name: &str, report: ProbeReport) -> Self {
        self.reports.insert(file_name.to_string(), report);
        self
    }

    /// Make every probe take this long
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ProbePort for ScriptedProbe {
    async fn probe(&self, path: &Path) -> ProbeReport {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let name = file_name(path);
        self.reports.get(&name).copied().unwrap_or(self.fallback)
    }
}

/// Behaviour of one scripted encoder run
#[derive(Debug, Clone)]
pub struct JobScript {
    lines: Vec<String>,
    exit_code: i32,
    line_delay: Duration,
    hold_open: bool,
    spawn_error: bool,
    suspend_supported: bool,
    ignore_terminate: bool,
}

impl Default for JobScript {
    fn default() -> Self {
        Self::succeed()
    }
}

impl JobScript {
    /// Exit 0 without output
    pub fn succeed() -> Self {
        Self {
            lines: Vec::new(),
            exit_code: 0,
            line_delay: Duration::ZERO,
            hold_open: false,
            spawn_error: false,
            suspend_supported: true,
            ignore_terminate: false,
        }
    }

    /// Exit with a non-zero code
    pub fn fail(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Self::succeed()
        }
    }

    /// Refuse to start
    pub fn spawn_error() -> Self {
        Self {
            spawn_error: true,
            ..Self::succeed()
        }
    }

    /// Emit these diagnostic lines before exiting
    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Emit one status line per elapsed second up to `seconds`
    pub fn with_ticks(self, seconds: u32) -> Self {
        self.with_lines(
            (1..=seconds).map(|s| format!("frame={} time=00:00:{:02}.00 bitrate=1.0kbits/s", s * 30, s)),
        )
    }

    /// Pause between lines
    pub fn with_line_delay(mut self, delay: Duration) -> Self {
        self.line_delay = delay;
        self
    }

    /// After the last line keep running until terminated
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Report suspend/continue as unsupported
    pub fn without_suspend(mut self) -> Self {
        self.suspend_supported = false;
        self
    }

    /// Keep running after `terminate`; only `kill` ends the run
    pub fn ignoring_terminate(mut self) -> Self {
        self.ignore_terminate = true;
        self
    }
}

/// Process-control call recorded by the scripted encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCall {
    Spawned(PathBuf),
    Paused(PathBuf),
    Resumed(PathBuf),
    Terminated(PathBuf),
    Killed(PathBuf),
}

/// Encoder adapter replaying `JobScript`s keyed by input file name
#[derive(Debug)]
pub struct ScriptedEncoder {
    scripts: HashMap<String, JobScript>,
    fallback: JobScript,
    available: bool,
    calls: Arc<Mutex<Vec<ScriptCall>>>,
}

impl ScriptedEncoder {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            fallback: JobScript::succeed(),
            available: true,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script used for any input not explicitly registered
    pub fn with_fallback(mut self, script: JobScript) -> Self {
        self.fallback = script;
        self
    }

    /// Register a script by input file name
    pub fn with_script(mut self, file_name: &str, script: JobScript) -> Self {
        self.scripts.insert(file_name.to_string(), script);
        self
    }

    /// Fail the availability check
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Every call recorded so far
    pub fn calls(&self) -> Vec<ScriptCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Inputs spawned so far, in order
    pub fn spawned(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ScriptCall::Spawned(path) => Some(path),
                _ => None,
            })
            .collect()
    }
}

impl Default for ScriptedEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EncodePort for ScriptedEncoder {
    async fn check_available(&self) -> Result<(), DomainError> {
        if self.available {
            Ok(())
        } else {
            Err(DomainError::SpawnFailed("Scripted encoder unavailable".to_string()))
        }
    }

    async fn spawn(&self, request: &EncodeRequest) -> Result<Box<dyn EncodeProcess>, DomainError> {
        let script = self
            .scripts
            .get(&file_name(&request.input))
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());

        if script.spawn_error {
            return Err(DomainError::SpawnFailed(format!(
                "Scripted spawn failure for {}",
                request.input.display()
            )));
        }

        // Leave something behind like a real encoder would
        if request.output.parent().map_or(false, Path::is_dir) {
            let _ = std::fs::write(&request.output, b"partial");
        }

        record(&self.calls, ScriptCall::Spawned(request.input.clone()));
        Ok(Box::new(ScriptedJob {
            input: request.input.clone(),
            lines: script.lines.iter().cloned().collect(),
            script,
            paused: false,
            terminated: false,
            killed: false,
            calls: Arc::clone(&self.calls),
        }))
    }
}

/// One scripted encoder run
pub struct ScriptedJob {
    input: PathBuf,
    script: JobScript,
    lines: VecDeque<String>,
    paused: bool,
    terminated: bool,
    killed: bool,
    calls: Arc<Mutex<Vec<ScriptCall>>>,
}

impl ScriptedJob {
    fn ended(&self) -> bool {
        self.killed || (self.terminated && !self.script.ignore_terminate)
    }
}

impl ProcessControl for ScriptedJob {
    fn pause(&mut self) -> Result<(), DomainError> {
        if !self.script.suspend_supported {
            return Err(DomainError::Unsupported("suspend".to_string()));
        }
        self.paused = true;
        record(&self.calls, ScriptCall::Paused(self.input.clone()));
        Ok(())
    }

    fn resume(&mut self) -> Result<(), DomainError> {
        if !self.script.suspend_supported {
            return Err(DomainError::Unsupported("continue".to_string()));
        }
        self.paused = false;
        record(&self.calls, ScriptCall::Resumed(self.input.clone()));
        Ok(())
    }

    fn terminate(&mut self) -> Result<(), DomainError> {
        self.terminated = true;
        record(&self.calls, ScriptCall::Terminated(self.input.clone()));
        Ok(())
    }

    fn kill(&mut self) -> Result<(), DomainError> {
        self.killed = true;
        record(&self.calls, ScriptCall::Killed(self.input.clone()));
        Ok(())
    }

    fn is_alive(&mut self) -> bool {
        !self.ended() && (!self.lines.is_empty() || self.script.hold_open)
    }
}

#[async_trait]
impl EncodeProcess for ScriptedJob {
    async fn next_line(&mut self) -> Option<String> {
        if self.ended() {
            return None;
        }
        if self.paused || (self.lines.is_empty() && self.script.hold_open) {
            // A suspended or idle process produces nothing
            std::future::pending::<()>().await;
        }
        if !self.script.line_delay.is_zero() {
            tokio::time::sleep(self.script.line_delay).await;
        }
        self.lines.pop_front()
    }

    async fn wait(&mut self) -> Result<ExitOutcome, DomainError> {
        if self.terminated && !self.ended() {
            // Still running until killed
            std::future::pending::<()>().await;
        }
        if self.ended() {
            return Ok(ExitOutcome { code: None });
        }
        Ok(ExitOutcome {
            code: Some(self.script.exit_code),
        })
    }
}

fn record(calls: &Arc<Mutex<Vec<ScriptCall>>>, call: ScriptCall) {
    calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}
