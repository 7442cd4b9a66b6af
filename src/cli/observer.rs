//! Console and JSON renderings of batch events

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::model::{BatchEvent, BatchState, FileItem, FileStatus};
use crate::ports::BatchObserver;

const BAR_WIDTH: usize = 20;

pub const FINISHED_MESSAGE: &str = "Transcoding finished!";
pub const ERROR_MESSAGE: &str = "An error occurred during transcoding.";

/// Human-readable progress on stdout
#[derive(Default)]
pub struct ConsoleObserver {
    total: AtomicUsize,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text for one event, `None` when nothing should be printed
    pub fn render(&self, event: &BatchEvent) -> Option<String> {
        match event {
            BatchEvent::ItemsLoaded { items } => {
                self.total.store(items.len(), Ordering::Relaxed);
                let mut text = format!("Queued {} file(s)", items.len());
                for (index, item) in items.iter().enumerate() {
                    text.push_str(&format!("\n  {:>3}. {}", index + 1, item.source().display()));
                }
                Some(text)
            }
            BatchEvent::ItemChanged { index, item } => self.render_item(*index, item),
            BatchEvent::Progress { percent } => Some(progress_bar(*percent)),
            BatchEvent::StateChanged { state } => Some(
                match state {
                    BatchState::Idle => "Nothing to do",
                    BatchState::FilesLoaded => "Ready",
                    BatchState::Running => "Running (p = pause, r = resume, s = stop)",
                    BatchState::Paused => "Paused",
                    BatchState::Done => FINISHED_MESSAGE,
                    BatchState::Stopped => "Stopped",
                    BatchState::Error => ERROR_MESSAGE,
                }
                .to_string(),
            ),
        }
    }

    fn render_item(&self, index: usize, item: &FileItem) -> Option<String> {
        let position = match self.total.load(Ordering::Relaxed) {
            0 => format!("[{}]", index + 1),
            total => format!("[{}/{}]", index + 1, total),
        };
        match item.status {
            FileStatus::Processing if item.progress == 0 => {
                Some(format!("{} Transcoding {}", position, item.file_name()))
            }
            FileStatus::Done => Some(format!("{} ✓ {}", position, item.file_name())),
            FileStatus::Error => Some(format!("{} ✗ {} failed", position, item.file_name())),
            _ => None,
        }
    }
}

impl BatchObserver for ConsoleObserver {
    fn on_event(&self, event: &BatchEvent) {
        if let Some(text) = self.render(event) {
            println!("{}", text);
        }
    }
}

fn progress_bar(percent: u8) -> String {
    let percent = percent.min(100);
    let filled = usize::from(percent) * BAR_WIDTH / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent
    )
}

/// One JSON object per event on stdout, stamped with RFC 3339 time
#[derive(Default)]
pub struct JsonObserver;

impl JsonObserver {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, event: &BatchEvent) -> Option<String> {
        let mut value = serde_json::to_value(event).ok()?;
        if let Some(object) = value.as_object_mut() {
            object.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        Some(value.to_string())
    }
}

impl BatchObserver for JsonObserver {
    fn on_event(&self, event: &BatchEvent) {
        if let Some(line) = self.render(event) {
            println!("{}", line);
        }
    }
}
