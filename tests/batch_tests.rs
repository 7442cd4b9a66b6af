#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::timeout;

use common::{media, TOOLS};
use recoder::adapters::scripted::{JobScript, ScriptedEncoder, ScriptedProbe};
use recoder::adapters::{FfmpegAdapter, FfprobeAdapter, RecodeConfig};
use recoder::domain::model::{BatchEvent, ErrorPolicy, ProbeReport};
use recoder::{AppContainer, BatchController, BatchSettings, BatchSnapshot, BatchState, DefaultAppContainer, FileStatus};

const LIMIT: Duration = Duration::from_secs(10);

fn controller(on_error: ErrorPolicy) -> BatchController {
    let tools = &*TOOLS;
    BatchController::new(
        Arc::new(FfprobeAdapter::new(&tools.prober)),
        Arc::new(FfmpegAdapter::new(&tools.encoder)),
        BatchSettings {
            on_error,
            ..BatchSettings::default()
        },
    )
}

async fn wait_until(controller: &BatchController, check: impl Fn(&BatchSnapshot) -> bool) {
    timeout(LIMIT, async {
        while !check(&controller.snapshot()) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_real_processes_transcode_batch() {
    let dir = TempDir::new().unwrap();
    let controller = controller(ErrorPolicy::FailFast);
    let mut events = controller.subscribe();

    controller
        .load_files(vec![media(dir.path(), "a.mp4"), media(dir.path(), "b.mkv")])
        .unwrap();
    controller.start().unwrap();
    let state = timeout(LIMIT, controller.join()).await.unwrap();

    assert_eq!(state, BatchState::Done);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.count(FileStatus::Done), 2);
    assert_eq!(snapshot.progress, 0);

    let args = std::fs::read_to_string(dir.path().join("transcoded").join("a.mov")).unwrap();
    assert!(args.starts_with("-y -i "));
    assert!(args.contains("-vf transpose=1"));
    assert!(!args.contains("scale="));
    assert!(dir.path().join("transcoded").join("b.mov").is_file());

    let mut percents = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let BatchEvent::Progress { percent } = event {
            percents.push(percent);
        }
    }
    let running: Vec<u8> = percents[1..percents.len() - 1].to_vec();
    assert!(running.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);
    assert_eq!(running.last(), Some(&100));
}

#[tokio::test]
async fn test_first_failure_stops_batch() {
    let dir = TempDir::new().unwrap();
    let controller = controller(ErrorPolicy::FailFast);

    controller
        .load_files(vec![media(dir.path(), "fail.mp4"), media(dir.path(), "b.mp4")])
        .unwrap();
    controller.start().unwrap();

    assert_eq!(timeout(LIMIT, controller.join()).await.unwrap(), BatchState::Error);
    let items = controller.snapshot().items;
    assert_eq!(items[0].status, FileStatus::Error);
    assert_eq!(items[1].status, FileStatus::Waiting);
    assert!(!dir.path().join("transcoded").join("b.mov").exists());
}

#[tokio::test]
async fn test_continue_policy_finishes_remaining_files() {
    let dir = TempDir::new().unwrap();
    let controller = controller(ErrorPolicy::Continue);

    controller
        .load_files(vec![media(dir.path(), "fail.mp4"), media(dir.path(), "b.mp4")])
        .unwrap();
    controller.start().unwrap();

    assert_eq!(timeout(LIMIT, controller.join()).await.unwrap(), BatchState::Error);
    let items = controller.snapshot().items;
    assert_eq!(items[0].status, FileStatus::Error);
    assert_eq!(items[1].status, FileStatus::Done);
    assert!(dir.path().join("transcoded").join("b.mov").is_file());
}

#[tokio::test]
async fn test_pause_resume_then_stop_real_process() {
    let dir = TempDir::new().unwrap();
    let controller = controller(ErrorPolicy::FailFast);
    let partial = dir.path().join("transcoded").join("slow.mov");

    controller
        .load_files(vec![media(dir.path(), "slow.mp4"), media(dir.path(), "b.mp4")])
        .unwrap();
    controller.start().unwrap();
    wait_until(&controller, |s| s.items[0].progress == 25).await;
    assert!(partial.is_file());

    controller.pause().unwrap();
    wait_until(&controller, |s| s.state == BatchState::Paused).await;
    controller.resume().unwrap();
    wait_until(&controller, |s| s.state == BatchState::Running).await;

    controller.stop().unwrap();
    assert_eq!(timeout(LIMIT, controller.join()).await.unwrap(), BatchState::Stopped);

    let items = controller.snapshot().items;
    assert_eq!(items[0].status, FileStatus::Error);
    assert_eq!(items[1].status, FileStatus::Waiting);
    assert!(!partial.exists());
}

#[tokio::test]
async fn test_stop_while_paused_real_process() {
    let dir = TempDir::new().unwrap();
    let controller = controller(ErrorPolicy::FailFast);

    controller.load_files(vec![media(dir.path(), "slow.mp4")]).unwrap();
    controller.start().unwrap();
    wait_until(&controller, |s| s.items[0].progress > 0).await;

    controller.pause().unwrap();
    controller.stop().unwrap();

    assert_eq!(timeout(LIMIT, controller.join()).await.unwrap(), BatchState::Stopped);
    assert!(!dir.path().join("transcoded").join("slow.mov").exists());
}

#[tokio::test]
async fn test_stop_kills_encoder_ignoring_sigterm() {
    let dir = TempDir::new().unwrap();
    let tools = &*TOOLS;
    let controller = BatchController::new(
        Arc::new(FfprobeAdapter::new(&tools.prober)),
        Arc::new(FfmpegAdapter::new(&tools.encoder)),
        BatchSettings {
            stop_grace: Duration::from_millis(300),
            ..BatchSettings::default()
        },
    );
    let partial = dir.path().join("transcoded").join("stubborn.mov");

    controller.load_files(vec![media(dir.path(), "stubborn.mp4")]).unwrap();
    controller.start().unwrap();
    wait_until(&controller, |s| s.items[0].progress == 25).await;
    assert!(partial.is_file());

    controller.stop().unwrap();
    assert_eq!(timeout(LIMIT, controller.join()).await.unwrap(), BatchState::Stopped);
    assert_eq!(controller.snapshot().items[0].status, FileStatus::Error);
    assert!(!partial.exists());
}

#[tokio::test]
async fn test_container_wires_custom_ports() {
    let dir = TempDir::new().unwrap();
    let mut config = RecodeConfig::default();
    config.output.folder_template = "{{stem}}-out".to_string();
    let encoder = Arc::new(ScriptedEncoder::new().with_fallback(JobScript::succeed().with_ticks(1)));
    let container = DefaultAppContainer::with_ports(
        &config,
        Arc::new(ScriptedProbe::new().with_fallback(ProbeReport::unknown())),
        encoder.clone(),
    )
    .unwrap();

    let controller = container.batch_controller();
    controller.load_files(vec![dir.path().join("clip.mov")]).unwrap();
    controller.start().unwrap();

    assert_eq!(timeout(LIMIT, controller.join()).await.unwrap(), BatchState::Done);
    assert_eq!(encoder.spawned(), vec![dir.path().join("clip.mov")]);
    assert!(dir.path().join("clip-out").join("clip.mov").is_file());
}
