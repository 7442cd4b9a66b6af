// Domain rules - Business logic and policies

use std::path::Path;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Input extensions accepted into a batch (compared case-insensitively)
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["mp4", "mov", "mkv", "avi"];

/// Whether a path names a supported media file
pub fn is_supported_media(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Derives the video filter chain that brings a source to the target frame
pub struct FilterPolicy;

impl FilterPolicy {
    /// Two steps: transpose portrait sources (by rotation tag, or by shape
    /// when no tag is present), then scale anything that is not exactly the
    /// target size.
    pub fn derive(geometry: &VideoGeometry, target_width: u32, target_height: u32) -> FilterChain {
        let mut steps = Vec::new();
        let mut dimensions = geometry.dimensions();

        let needs_transpose = match geometry.rotation {
            Some(90) | Some(270) => true,
            Some(r) if r != 0 => false,
            _ => matches!(dimensions, Some((w, h)) if h > w),
        };

        if needs_transpose {
            steps.push(FilterStep::Transpose);
            dimensions = dimensions.map(|(w, h)| (h, w));
        }

        if let Some(dims) = dimensions {
            if dims != (target_width, target_height) {
                steps.push(FilterStep::Scale {
                    width: target_width,
                    height: target_height,
                });
            }
        }

        FilterChain { steps }
    }
}

/// Converts fractional job progress into the integer percentages shown to
/// observers
pub struct ProgressMath;

impl ProgressMath {
    /// Item percentage for a 0.0-1.0 fraction
    pub fn item_percent(fraction: f64) -> u8 {
        Self::to_percent(fraction)
    }

    /// Batch percentage crediting partial completion of the in-flight item.
    /// `index` is zero-based.
    pub fn batch_percent(index: usize, total: usize, fraction: f64) -> u8 {
        if total == 0 {
            return 0;
        }
        let fraction = Self::clamp(fraction);
        Self::to_percent((index as f64 + fraction) / total as f64)
    }

    fn clamp(fraction: f64) -> f64 {
        if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        }
    }

    fn to_percent(fraction: f64) -> u8 {
        (Self::clamp(fraction) * 100.0).round() as u8
    }
}

/// User actions on the batch state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    Load,
    Start,
    Pause,
    Resume,
    Stop,
}

impl BatchAction {
    fn label(&self) -> &'static str {
        match self {
            BatchAction::Load => "load files",
            BatchAction::Start => "start",
            BatchAction::Pause => "pause",
            BatchAction::Resume => "resume",
            BatchAction::Stop => "stop",
        }
    }
}

/// Transition table for user-initiated actions
pub struct BatchTransitions;

impl BatchTransitions {
    /// State reached by applying `action` in `from`, or an error naming both
    pub fn apply(from: BatchState, action: BatchAction) -> Result<BatchState, DomainError> {
        use BatchState::*;

        let to = match (from, action) {
            (Idle | FilesLoaded | Done | Stopped | Error, BatchAction::Load) => FilesLoaded,
            (FilesLoaded | Done | Stopped | Error, BatchAction::Start) => Running,
            (Running, BatchAction::Pause) => Paused,
            (Paused, BatchAction::Resume) => Running,
            (Running | Paused, BatchAction::Stop) => Stopped,
            _ => return Err(Self::rejected(from, action)),
        };

        Ok(to)
    }

    /// Error for `action` refused while the batch is in `from`
    pub fn rejected(from: BatchState, action: BatchAction) -> DomainError {
        DomainError::InvalidTransition {
            from: from.to_string(),
            action: action.label().to_string(),
        }
    }

    /// Terminal state of a run once the worker leaves its loop
    pub fn conclude(stopped: bool, any_failed: bool) -> BatchState {
        if stopped {
            BatchState::Stopped
        } else if any_failed {
            BatchState::Error
        } else {
            BatchState::Done
        }
    }
}
