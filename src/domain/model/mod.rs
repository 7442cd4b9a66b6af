// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Duration assumed when the prober cannot report one
pub const FALLBACK_DURATION_SECS: f64 = 1.0;

/// Status of one queued file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Waiting,
    Processing,
    Done,
    Error,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileStatus::Waiting => "waiting",
            FileStatus::Processing => "processing",
            FileStatus::Done => "done",
            FileStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Tracked state of one input file within a batch.
///
/// The source path never changes after creation. Status and progress only
/// move through the helpers below so the progress rules stay in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileItem {
    source: PathBuf,
    pub status: FileStatus,
    pub progress: u8,
}

impl FileItem {
    /// Create a waiting item for a source file
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            status: FileStatus::Waiting,
            progress: 0,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Display name of the source file
    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source.to_string_lossy().to_string())
    }

    pub fn mark_processing(&mut self) {
        self.status = FileStatus::Processing;
        self.progress = 0;
    }

    /// Record in-flight progress. Returns false when the value would not
    /// advance the item.
    pub fn advance(&mut self, percent: u8) -> bool {
        let percent = percent.min(100);
        if self.status != FileStatus::Processing || percent <= self.progress {
            return false;
        }
        self.progress = percent;
        true
    }

    pub fn mark_done(&mut self) {
        self.status = FileStatus::Done;
        self.progress = 100;
    }

    pub fn mark_error(&mut self) {
        self.status = FileStatus::Error;
        self.progress = 0;
    }

    pub fn reset(&mut self) {
        self.status = FileStatus::Waiting;
        self.progress = 0;
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, FileStatus::Done | FileStatus::Error)
    }
}

/// Batch-level state exposed to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Idle,
    FilesLoaded,
    Running,
    Paused,
    Done,
    Stopped,
    Error,
}

impl BatchState {
    /// A run is in flight (worker alive)
    pub fn is_active(&self) -> bool {
        matches!(self, BatchState::Running | BatchState::Paused)
    }

    /// A run has concluded
    pub fn is_finished(&self) -> bool {
        matches!(self, BatchState::Done | BatchState::Stopped | BatchState::Error)
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BatchState::Idle => "idle",
            BatchState::FilesLoaded => "files loaded",
            BatchState::Running => "running",
            BatchState::Paused => "paused",
            BatchState::Done => "done",
            BatchState::Stopped => "stopped",
            BatchState::Error => "error",
        };
        f.write_str(label)
    }
}

/// User-requested control for the live run, carried worker-ward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobControl {
    Run,
    Pause,
    Stop,
}

/// Geometry of the first video stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoGeometry {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Rotation in degrees, normalized to 0..360. `None` when the file
    /// carries no rotation metadata.
    pub rotation: Option<u32>,
}

impl VideoGeometry {
    pub fn new(width: u32, height: u32, rotation: Option<i64>) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            rotation: rotation.map(normalize_rotation),
        }
    }

    /// Both dimensions are known
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

/// Fold any rotation value (negative or beyond a full turn) into 0..360
pub fn normalize_rotation(degrees: i64) -> u32 {
    degrees.rem_euclid(360) as u32
}

/// Result of probing one media file. Missing values mean "unknown".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub duration: Option<f64>,
    pub geometry: VideoGeometry,
}

impl ProbeReport {
    /// Report for a file the prober could not read
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Duration to normalize progress against, never zero
    pub fn effective_duration(&self) -> f64 {
        match self.duration {
            Some(d) if d.is_finite() && d > 0.0 => d,
            _ => FALLBACK_DURATION_SECS,
        }
    }
}

/// One step of the video filter chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterStep {
    /// Rotate 90 degrees clockwise
    Transpose,
    /// Scale to a fixed frame size
    Scale { width: u32, height: u32 },
}

impl fmt::Display for FilterStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterStep::Transpose => write!(f, "transpose=1"),
            FilterStep::Scale { width, height } => write!(f, "scale={}:{}", width, height),
        }
    }
}

/// Ordered video filter steps applied during encoding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChain {
    pub steps: Vec<FilterStep>,
}

impl FilterChain {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Value for the encoder's `-vf` option, `None` when nothing to apply
    pub fn to_arg(&self) -> Option<String> {
        if self.steps.is_empty() {
            return None;
        }
        Some(
            self.steps
                .iter()
                .map(|step| step.to_string())
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

/// Fixed target profile for the intermediate output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeProfile {
    pub video_codec: String,
    pub audio_codec: String,
    pub video_bitrate: String,
    pub pixel_format: String,
    pub frame_rate: String,
    pub container: String,
    pub extension: String,
    pub target_width: u32,
    pub target_height: u32,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            video_codec: "dnxhd".to_string(),
            audio_codec: "pcm_s16le".to_string(),
            video_bitrate: "36M".to_string(),
            pixel_format: "yuv422p".to_string(),
            frame_rate: "30000/1001".to_string(),
            container: "mov".to_string(),
            extension: "mov".to_string(),
            target_width: 1920,
            target_height: 1080,
        }
    }
}

impl EncodeProfile {
    /// Validate profile values
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(DomainError::BadArgs(
                "Target dimensions must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("video_codec", &self.video_codec),
            ("audio_codec", &self.audio_codec),
            ("container", &self.container),
            ("extension", &self.extension),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::BadArgs(format!("Profile {} cannot be empty", name)));
            }
        }
        Ok(())
    }
}

/// What the batch does after one item fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Abort remaining items
    #[default]
    FailFast,
    /// Keep processing remaining items; the batch still ends in Error
    Continue,
}

impl ErrorPolicy {
    /// Parse policy from string
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_lowercase().as_str() {
            "fail-fast" | "failfast" | "abort" => Ok(ErrorPolicy::FailFast),
            "continue" => Ok(ErrorPolicy::Continue),
            other => Err(DomainError::BadArgs(format!(
                "Invalid error policy: {}. Valid policies: fail-fast, continue",
                other
            ))),
        }
    }
}

/// Change notification published by the batch controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    /// A new batch replaced the item collection
    ItemsLoaded { items: Vec<FileItem> },
    /// One item changed status or progress
    ItemChanged { index: usize, item: FileItem },
    /// Aggregate progress changed (0-100)
    Progress { percent: u8 },
    /// Batch state changed
    StateChanged { state: BatchState },
}

/// Consistent copy of the controller's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    pub state: BatchState,
    pub progress: u8,
    pub items: Vec<FileItem>,
}

impl Default for BatchSnapshot {
    fn default() -> Self {
        Self {
            state: BatchState::Idle,
            progress: 0,
            items: Vec::new(),
        }
    }
}

impl BatchSnapshot {
    /// Count items in a given status
    pub fn count(&self, status: FileStatus) -> usize {
        self.items.iter().filter(|item| item.status == status).count()
    }
}

#[cfg(test)]
mod tests;
