// Batch controller - sequential supervisor for encoder jobs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::engine::command::build_request;
use crate::engine::job::{EncodeJob, JobObserver, JobOutcome, DEFAULT_STOP_GRACE};
use crate::ports::*;
use crate::utils::path::OutputTemplate;

/// Settings applied to every run of a controller
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub profile: EncodeProfile,
    pub output: OutputTemplate,
    pub on_error: ErrorPolicy,
    /// Wait after terminating a cancelled encoder before killing it
    pub stop_grace: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            profile: EncodeProfile::default(),
            output: OutputTemplate::default(),
            on_error: ErrorPolicy::default(),
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }
}

/// Owns the queue of files and drives one encoder job at a time.
///
/// All methods take `&self`; share the controller behind an `Arc` to drive it
/// from several tasks. `start` must be called inside a tokio runtime.
///
/// While a run is live the worker task is the only writer of items and
/// state. Commands only record the requested control value; the worker
/// publishes the resulting state once it has acted on it.
pub struct BatchController {
    probe: Arc<dyn ProbePort>,
    encoder: Arc<dyn EncodePort>,
    settings: Arc<BatchSettings>,
    shared: Arc<Shared>,
    run: Mutex<Option<RunHandle>>,
}

struct RunHandle {
    control: watch::Sender<JobControl>,
    /// Flipped by the worker before it publishes the terminal state; closed
    /// without flipping if the worker dies
    finished: watch::Receiver<bool>,
}

impl RunHandle {
    fn is_live(&self) -> bool {
        !*self.finished.borrow() && self.finished.has_changed().is_ok()
    }
}

impl BatchController {
    pub fn new(
        probe: Arc<dyn ProbePort>,
        encoder: Arc<dyn EncodePort>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            probe,
            encoder,
            settings: Arc::new(settings),
            shared: Arc::new(Shared::default()),
            run: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Consistent copy of state, progress and items
    pub fn snapshot(&self) -> BatchSnapshot {
        self.shared.lock().snapshot.clone()
    }

    /// Receive every change from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<BatchEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.lock().subscribers.push(tx);
        rx
    }

    /// A worker is running or still winding down
    pub fn is_live(&self) -> bool {
        self.run_handle().as_ref().map_or(false, RunHandle::is_live)
    }

    /// Replace the queue with `files`, all waiting
    pub fn load_files(&self, files: Vec<PathBuf>) -> Result<(), DomainError> {
        let run = self.run_handle();
        let mut inner = self.shared.lock();
        let current = inner.snapshot.state;
        if run.as_ref().map_or(false, RunHandle::is_live) {
            return Err(BatchTransitions::rejected(current, BatchAction::Load));
        }

        let loaded = BatchTransitions::apply(current, BatchAction::Load)?;
        let next = if files.is_empty() { BatchState::Idle } else { loaded };

        info!("Loaded {} file(s)", files.len());
        inner.snapshot.items = files.into_iter().map(FileItem::new).collect();
        let items = inner.snapshot.items.clone();
        inner.publish(BatchEvent::ItemsLoaded { items });
        inner.set_progress(0);
        inner.set_state(next);
        Ok(())
    }

    /// Begin processing every item from the top
    pub fn start(&self) -> Result<(), DomainError> {
        let mut run = self.run_handle();
        let (finished, finished_rx) = watch::channel(false);
        let receiver = {
            let mut inner = self.shared.lock();
            let current = inner.snapshot.state;
            if run.as_ref().map_or(false, RunHandle::is_live) {
                return Err(BatchTransitions::rejected(current, BatchAction::Start));
            }
            let next = BatchTransitions::apply(current, BatchAction::Start)?;

            for index in 0..inner.snapshot.items.len() {
                let item = &mut inner.snapshot.items[index];
                if item.status != FileStatus::Waiting || item.progress != 0 {
                    item.reset();
                    let item = item.clone();
                    inner.publish(BatchEvent::ItemChanged { index, item });
                }
            }
            inner.set_progress(0);
            inner.set_state(next);

            let (control, receiver) = watch::channel(JobControl::Run);
            *run = Some(RunHandle {
                control,
                finished: finished_rx,
            });
            receiver
        };

        let worker = BatchRun {
            probe: Arc::clone(&self.probe),
            encoder: Arc::clone(&self.encoder),
            settings: Arc::clone(&self.settings),
            shared: Arc::clone(&self.shared),
            control: receiver,
            finished,
        };
        info!("Starting batch of {} file(s)", self.snapshot().items.len());
        tokio::spawn(worker.execute());
        drop(run);
        Ok(())
    }

    /// Suspend the current job
    pub fn pause(&self) -> Result<(), DomainError> {
        self.request(BatchAction::Pause, JobControl::Run, JobControl::Pause)
    }

    /// Continue a paused job
    pub fn resume(&self) -> Result<(), DomainError> {
        self.request(BatchAction::Resume, JobControl::Pause, JobControl::Run)
    }

    /// Terminate the current job and abandon the rest. Returns without
    /// waiting; use `join` to wait for the worker.
    pub fn stop(&self) -> Result<(), DomainError> {
        let run = self.run_handle();
        let current = self.shared.lock().snapshot.state;
        let handle = match run.as_ref() {
            Some(handle) if handle.is_live() => handle,
            _ => return Err(BatchTransitions::rejected(current, BatchAction::Stop)),
        };
        if *handle.control.borrow() == JobControl::Stop {
            return Err(BatchTransitions::rejected(BatchState::Stopped, BatchAction::Stop));
        }
        info!("Stop requested");
        handle.control.send_replace(JobControl::Stop);
        Ok(())
    }

    /// Wait for the current run, if any, and return the resulting state.
    /// Cancel-safe; any number of callers may wait.
    pub async fn join(&self) -> BatchState {
        let finished = self.run_handle().as_ref().map(|handle| handle.finished.clone());
        if let Some(mut finished) = finished {
            if finished.wait_for(|done| *done).await.is_err() {
                error!("Batch worker ended without concluding");
                let mut inner = self.shared.lock();
                inner.set_progress(0);
                inner.set_state(BatchState::Error);
            }
        }
        self.snapshot().state
    }

    fn request(
        &self,
        action: BatchAction,
        expected: JobControl,
        next: JobControl,
    ) -> Result<(), DomainError> {
        let run = self.run_handle();
        let current = self.shared.lock().snapshot.state;
        let handle = match run.as_ref() {
            Some(handle) if handle.is_live() => handle,
            _ => return Err(BatchTransitions::rejected(current, action)),
        };

        let requested = *handle.control.borrow();
        if requested != expected {
            return Err(BatchTransitions::rejected(requested_state(requested), action));
        }
        debug!("{:?} requested", next);
        handle.control.send_replace(next);
        Ok(())
    }

    fn run_handle(&self) -> MutexGuard<'_, Option<RunHandle>> {
        self.run.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// State the worker will reach once it acts on `control`
fn requested_state(control: JobControl) -> BatchState {
    match control {
        JobControl::Run => BatchState::Running,
        JobControl::Pause => BatchState::Paused,
        JobControl::Stop => BatchState::Stopped,
    }
}

#[derive(Default)]
struct Shared {
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Snapshot plus subscribers under one lock so events leave in state order
#[derive(Default)]
struct Inner {
    snapshot: BatchSnapshot,
    subscribers: Vec<mpsc::UnboundedSender<BatchEvent>>,
}

impl Inner {
    fn publish(&mut self, event: BatchEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn set_state(&mut self, state: BatchState) {
        if self.snapshot.state != state {
            debug!("Batch state {} -> {}", self.snapshot.state, state);
            self.snapshot.state = state;
            self.publish(BatchEvent::StateChanged { state });
        }
    }

    fn set_progress(&mut self, percent: u8) {
        if self.snapshot.progress != percent {
            self.snapshot.progress = percent;
            self.publish(BatchEvent::Progress { percent });
        }
    }

    /// Raise batch progress; lower values are ignored
    fn advance_progress(&mut self, percent: u8) {
        if percent > self.snapshot.progress {
            self.set_progress(percent);
        }
    }

    fn update_item(&mut self, index: usize, change: impl FnOnce(&mut FileItem) -> bool) {
        let Some(item) = self.snapshot.items.get_mut(index) else {
            return;
        };
        if change(item) {
            let item = item.clone();
            self.publish(BatchEvent::ItemChanged { index, item });
        }
    }
}

/// Worker for one run
struct BatchRun {
    probe: Arc<dyn ProbePort>,
    encoder: Arc<dyn EncodePort>,
    settings: Arc<BatchSettings>,
    shared: Arc<Shared>,
    control: watch::Receiver<JobControl>,
    finished: watch::Sender<bool>,
}

impl BatchRun {
    async fn execute(mut self) {
        let sources: Vec<PathBuf> = self
            .shared
            .lock()
            .snapshot
            .items
            .iter()
            .map(|item| item.source().to_path_buf())
            .collect();
        let total = sources.len();
        let mut stopped = false;
        let mut any_failed = false;

        for (index, source) in sources.iter().enumerate() {
            if !self.pass_gate().await {
                stopped = true;
                break;
            }

            info!("[{}/{}] {}", index + 1, total, source.display());
            self.shared.lock().update_item(index, |item| {
                item.mark_processing();
                true
            });

            let outcome = self.process(index, total, source).await;
            let mut inner = self.shared.lock();
            match outcome {
                JobOutcome::Completed => {
                    inner.update_item(index, |item| {
                        item.mark_done();
                        true
                    });
                    inner.advance_progress(ProgressMath::batch_percent(index, total, 1.0));
                }
                JobOutcome::Failed { reason } => {
                    error!("{} failed: {}", source.display(), reason);
                    inner.update_item(index, |item| {
                        item.mark_error();
                        true
                    });
                    any_failed = true;
                    if self.settings.on_error == ErrorPolicy::FailFast {
                        info!("Stopping batch after failure");
                        break;
                    }
                }
                JobOutcome::Cancelled => {
                    inner.update_item(index, |item| {
                        item.mark_error();
                        true
                    });
                    stopped = true;
                    break;
                }
            }
        }

        self.conclude(stopped, any_failed);
    }

    /// Hold between items while paused. Returns false when stop was requested.
    async fn pass_gate(&mut self) -> bool {
        loop {
            let requested = *self.control.borrow_and_update();
            match requested {
                JobControl::Run => {
                    self.shared.lock().set_state(BatchState::Running);
                    return true;
                }
                JobControl::Stop => return false,
                JobControl::Pause => {
                    self.shared.lock().set_state(BatchState::Paused);
                    if self.control.changed().await.is_err() {
                        return false;
                    }
                }
            }
        }
    }

    async fn process(&mut self, index: usize, total: usize, source: &Path) -> JobOutcome {
        let report = tokio::select! {
            report = self.probe.probe(source) => report,
            _ = stop_requested(&mut self.control) => return JobOutcome::Cancelled,
        };

        let profile = &self.settings.profile;
        let filters = FilterPolicy::derive(&report.geometry, profile.target_width, profile.target_height);
        let output_dir = self.settings.output.resolve(source);
        if let Err(e) = tokio::fs::create_dir_all(&output_dir).await {
            return JobOutcome::Failed {
                reason: format!("cannot create {}: {}", output_dir.display(), e),
            };
        }
        let output = self.settings.output.output_path(source, &profile.extension);
        debug!(
            "{} -> {} (filters: {})",
            source.display(),
            output.display(),
            filters.to_arg().unwrap_or_else(|| "none".to_string())
        );

        let job = EncodeJob::new(build_request(source, &output, profile, &filters), report.effective_duration())
            .with_stop_grace(self.settings.stop_grace);
        let mut observer = ItemProgress {
            shared: Arc::clone(&self.shared),
            index,
            total,
        };
        job.run(self.encoder.as_ref(), &mut self.control, &mut observer).await
    }

    fn conclude(&self, stopped: bool, any_failed: bool) {
        let state = BatchTransitions::conclude(stopped, any_failed);
        let mut inner = self.shared.lock();
        self.finished.send_replace(true);
        match state {
            BatchState::Done => {
                inner.set_progress(100);
                inner.set_state(BatchState::Done);
                info!("Transcoding finished!");
            }
            BatchState::Error => {
                inner.set_state(BatchState::Error);
                warn!("An error occurred during transcoding.");
            }
            other => {
                inner.set_state(other);
                info!("Batch {}", other);
            }
        }
        inner.set_progress(0);
    }
}

/// Resolves once stop is requested or the controller is gone
async fn stop_requested(control: &mut watch::Receiver<JobControl>) {
    loop {
        if *control.borrow_and_update() == JobControl::Stop {
            return;
        }
        if control.changed().await.is_err() {
            return;
        }
    }
}

/// Maps job progress onto the item and the batch
struct ItemProgress {
    shared: Arc<Shared>,
    index: usize,
    total: usize,
}

impl JobObserver for ItemProgress {
    fn on_progress(&mut self, fraction: f64) {
        let mut inner = self.shared.lock();
        let percent = ProgressMath::item_percent(fraction);
        inner.update_item(self.index, |item| item.advance(percent));
        inner.advance_progress(ProgressMath::batch_percent(self.index, self.total, fraction));
    }

    fn on_paused(&mut self) {
        self.shared.lock().set_state(BatchState::Paused);
    }

    fn on_resumed(&mut self) {
        self.shared.lock().set_state(BatchState::Running);
    }
}
