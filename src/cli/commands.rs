//! Command implementations

use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{info, warn};

use crate::adapters::toml_config::RecodeConfig;
use crate::app::batch_controller::BatchController;
use crate::app::container::{AppContainer, DefaultAppContainer};
use crate::app::events::forward_until;
use crate::cli::args::{ProbeArgs, RunArgs};
use crate::cli::observer::{ConsoleObserver, JsonObserver};
use crate::domain::model::{BatchState, ErrorPolicy, FileStatus, ProbeReport};
use crate::domain::rules::FilterPolicy;
use crate::engine::build_request;
use crate::error::RecodeError;
use crate::ports::BatchObserver;
use crate::utils::path::{collect_media_files, input_to_path};
use crate::utils::time::format_clock;

/// Control typed on stdin while a batch runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractiveCommand {
    Pause,
    Resume,
    Stop,
}

impl InteractiveCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "p" | "pause" => Some(Self::Pause),
            "r" | "resume" => Some(Self::Resume),
            "s" | "stop" | "q" | "quit" => Some(Self::Stop),
            _ => None,
        }
    }

    fn apply(self, controller: &BatchController) {
        let result = match self {
            Self::Pause => controller.pause(),
            Self::Resume => controller.resume(),
            Self::Stop => controller.stop(),
        };
        if let Err(e) = result {
            warn!("{}", e);
        }
    }
}

/// Process exit code for a finished batch
pub fn exit_code(state: BatchState) -> u8 {
    match state {
        BatchState::Done => 0,
        BatchState::Stopped => 2,
        _ => 1,
    }
}

/// Execute the run command
pub async fn run(args: RunArgs, mut config: RecodeConfig) -> Result<BatchState> {
    if let Some(template) = args.output_template {
        config.output.folder_template = template;
    }
    if args.continue_on_error {
        config.batch.on_error = ErrorPolicy::Continue;
    }

    let files = collect_media_files(&args.inputs).context("Failed to collect input files")?;
    let container = DefaultAppContainer::new(&config).context("Invalid configuration")?;

    let observer: Box<dyn BatchObserver> = if args.json {
        Box::new(JsonObserver::new())
    } else {
        Box::new(ConsoleObserver::new())
    };

    run_batch(&container, files, observer.as_ref(), spawn_stdin_reader()).await
}

/// Drive one batch to completion, taking controls from `commands` and Ctrl+C
pub async fn run_batch(
    container: &dyn AppContainer,
    files: Vec<PathBuf>,
    observer: &dyn BatchObserver,
    mut commands: UnboundedReceiver<InteractiveCommand>,
) -> Result<BatchState> {
    container
        .encode_port()
        .check_available()
        .await
        .map_err(|e| RecodeError::EncoderUnavailable { message: e.to_string() })?;

    let controller = container.batch_controller();
    let mut events = controller.subscribe();
    controller.load_files(files)?;
    controller.start()?;

    let mut interrupts = true;
    let state = forward_until(&mut events, observer, async {
        loop {
            tokio::select! {
                state = controller.join() => break state,
                Some(command) = commands.recv() => command.apply(&controller),
                signal = tokio::signal::ctrl_c(), if interrupts => match signal {
                    Ok(()) => {
                        warn!("Interrupted, stopping batch");
                        InteractiveCommand::Stop.apply(&controller);
                    }
                    Err(e) => {
                        warn!("Cannot listen for Ctrl+C: {}", e);
                        interrupts = false;
                    }
                },
            }
        }
    })
    .await;

    let snapshot = controller.snapshot();
    info!(
        "Batch {}: {} done, {} failed, {} not started",
        state,
        snapshot.count(FileStatus::Done),
        snapshot.count(FileStatus::Error),
        snapshot.count(FileStatus::Waiting),
    );
    Ok(state)
}

/// Read interactive commands on a plain thread; blocking stdin reads cannot be
/// cancelled, so they must stay off the runtime.
fn spawn_stdin_reader() -> UnboundedReceiver<InteractiveCommand> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match InteractiveCommand::parse(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None => warn!("Unknown command '{}' (p = pause, r = resume, s = stop)", line.trim()),
            }
        }
    });
    rx
}

/// What the run command would do with one file
#[derive(Debug, Clone, Serialize)]
pub struct ProbePlan {
    pub input: PathBuf,
    pub output: PathBuf,
    pub report: ProbeReport,
    pub filters: Option<String>,
    pub encoder_args: Vec<String>,
}

/// Execute the probe command
pub async fn probe(args: ProbeArgs, config: RecodeConfig) -> Result<()> {
    let container = DefaultAppContainer::new(&config).context("Invalid configuration")?;
    let plan = plan_probe(&container, &input_to_path(&args.input)).await?;

    if args.json {
        let json = serde_json::to_string_pretty(&plan).context("Failed to serialize probe result")?;
        println!("{}", json);
    } else {
        print_probe_plan(&plan);
    }
    Ok(())
}

pub async fn plan_probe(container: &dyn AppContainer, input: &Path) -> Result<ProbePlan> {
    if !input.is_file() {
        return Err(RecodeError::InputNotFound {
            path: input.to_string_lossy().to_string(),
        }
        .into());
    }

    let settings = container.batch_settings();
    let report = container.probe_port().probe(input).await;
    let filters = FilterPolicy::derive(
        &report.geometry,
        settings.profile.target_width,
        settings.profile.target_height,
    );
    let output = settings.output.output_path(input, &settings.profile.extension);
    let request = build_request(input, &output, &settings.profile, &filters);

    Ok(ProbePlan {
        input: input.to_path_buf(),
        output,
        report,
        filters: filters.to_arg(),
        encoder_args: request
            .args
            .iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect(),
    })
}

fn print_probe_plan(plan: &ProbePlan) {
    let geometry = plan.report.geometry;
    println!("Probe Result");
    println!("============");
    println!("File: {}", plan.input.display());
    match plan.report.duration {
        Some(duration) => println!("Duration: {:.3}s ({})", duration, format_clock(duration)),
        None => println!("Duration: unknown"),
    }
    match geometry.dimensions() {
        Some((width, height)) => println!("Frame: {}x{}", width, height),
        None => println!("Frame: unknown"),
    }
    println!("Rotation: {}", geometry.rotation.map_or("none".to_string(), |r| format!("{}°", r)));
    println!();
    println!("Filters: {}", plan.filters.as_deref().unwrap_or("none"));
    println!("Output: {}", plan.output.display());
    println!("Encoder arguments: {}", plan.encoder_args.join(" "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::scripted::{JobScript, ScriptCall, ScriptedEncoder, ScriptedProbe};
    use crate::domain::model::{BatchEvent, VideoGeometry};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default)]
    struct Collect(Mutex<Vec<BatchEvent>>);

    impl BatchObserver for Collect {
        fn on_event(&self, event: &BatchEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    fn container(probe: ScriptedProbe, encoder: Arc<ScriptedEncoder>) -> DefaultAppContainer {
        DefaultAppContainer::with_ports(&RecodeConfig::default(), Arc::new(probe), encoder).unwrap()
    }

    fn media(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"video").unwrap();
        path
    }

    #[test]
    fn test_parse_interactive_commands() {
        assert_eq!(InteractiveCommand::parse("p"), Some(InteractiveCommand::Pause));
        assert_eq!(InteractiveCommand::parse(" Resume \n"), Some(InteractiveCommand::Resume));
        assert_eq!(InteractiveCommand::parse("s"), Some(InteractiveCommand::Stop));
        assert_eq!(InteractiveCommand::parse("go"), None);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(BatchState::Done), 0);
        assert_eq!(exit_code(BatchState::Error), 1);
        assert_eq!(exit_code(BatchState::Stopped), 2);
    }

    #[tokio::test]
    async fn test_run_batch_reports_every_event() {
        let dir = TempDir::new().unwrap();
        let files = vec![media(&dir, "a.mp4"), media(&dir, "b.mov")];
        let encoder = Arc::new(ScriptedEncoder::new().with_fallback(JobScript::succeed().with_ticks(2)));
        let container = container(ScriptedProbe::new(), encoder);
        let observer = Collect::default();
        let (_tx, rx) = mpsc::unbounded_channel();

        let state = run_batch(&container, files, &observer, rx).await.unwrap();

        assert_eq!(state, BatchState::Done);
        let events = observer.0.lock().unwrap();
        assert!(matches!(events.first(), Some(BatchEvent::ItemsLoaded { items }) if items.len() == 2));
        assert!(events.contains(&BatchEvent::StateChanged { state: BatchState::Done }));
        assert_eq!(events.last(), Some(&BatchEvent::Progress { percent: 0 }));
    }

    #[tokio::test]
    async fn test_run_batch_stop_command() {
        let dir = TempDir::new().unwrap();
        let files = vec![media(&dir, "a.mp4"), media(&dir, "b.mp4")];
        let encoder = Arc::new(ScriptedEncoder::new().with_fallback(JobScript::succeed().hold_open()));
        let container = container(ScriptedProbe::new(), encoder.clone());
        let observer = Collect::default();
        let (tx, rx) = mpsc::unbounded_channel();

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            tx.send(InteractiveCommand::Stop).unwrap();
            tx
        });
        let state = run_batch(&container, files, &observer, rx).await.unwrap();
        drop(stopper.await.unwrap());

        assert_eq!(state, BatchState::Stopped);
        assert!(encoder
            .calls()
            .iter()
            .any(|call| matches!(call, ScriptCall::Terminated(_))));
    }

    #[tokio::test]
    async fn test_run_batch_requires_encoder() {
        let dir = TempDir::new().unwrap();
        let encoder = Arc::new(ScriptedEncoder::new().unavailable());
        let container = container(ScriptedProbe::new(), encoder.clone());
        let (_tx, rx) = mpsc::unbounded_channel();

        let err = run_batch(&container, vec![media(&dir, "a.mp4")], &Collect::default(), rx)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RecodeError>(),
            Some(RecodeError::EncoderUnavailable { .. })
        ));
        assert!(encoder.spawned().is_empty());
    }

    #[tokio::test]
    async fn test_plan_probe_rotated_source() {
        let dir = TempDir::new().unwrap();
        let input = media(&dir, "phone.mp4");
        let probe = ScriptedProbe::new().with_fallback(ProbeReport {
            duration: Some(12.5),
            geometry: VideoGeometry::new(1080, 1920, Some(90)),
        });
        let container = container(probe, Arc::new(ScriptedEncoder::new()));

        let plan = plan_probe(&container, &input).await.unwrap();

        assert_eq!(plan.filters.as_deref(), Some("transpose=1"));
        assert_eq!(plan.output, dir.path().join("transcoded").join("phone.mov"));
        assert_eq!(plan.encoder_args.first().map(String::as_str), Some("-y"));
        assert!(plan.encoder_args.contains(&"transpose=1".to_string()));
    }

    #[tokio::test]
    async fn test_plan_probe_missing_input() {
        let dir = TempDir::new().unwrap();
        let container = container(
            ScriptedProbe::new(),
            Arc::new(ScriptedEncoder::new()),
        );
        let err = plan_probe(&container, &dir.path().join("none.mp4")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecodeError>(),
            Some(RecodeError::InputNotFound { .. })
        ));
    }
}
