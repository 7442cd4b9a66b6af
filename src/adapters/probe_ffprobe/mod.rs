//! FFprobe adapter for media file probing
//!
//! Two invocations per file: container duration, then geometry of the first
//! video stream. Any failure degrades to "unknown" values.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::model::*;
use crate::ports::*;

/// FFprobe-based probe adapter
pub struct FfprobeAdapter {
    program: PathBuf,
}

impl FfprobeAdapter {
    /// Create adapter for the given prober binary
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run the prober and return its stdout, `None` on any failure
    async fn query(&self, args: &[&str], path: &Path) -> Option<String> {
        let output = Command::new(&self.program)
            .args(args)
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => {
                warn!(
                    "{} exited with {} for {}: {}",
                    self.program.display(),
                    output.status,
                    path.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                None
            }
            Err(e) => {
                warn!("Failed to run {}: {}", self.program.display(), e);
                None
            }
        }
    }
}

const DURATION_ARGS: [&str; 6] = [
    "-v",
    "error",
    "-show_entries",
    "format=duration",
    "-of",
    "default=noprint_wrappers=1:nokey=1",
];

const GEOMETRY_ARGS: [&str; 8] = [
    "-v",
    "error",
    "-select_streams",
    "v:0",
    "-show_entries",
    "stream=width,height:stream_tags=rotate:stream_side_data=rotation",
    "-of",
    "default=noprint_wrappers=1",
];

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe(&self, path: &Path) -> ProbeReport {
        let duration = self
            .query(&DURATION_ARGS, path)
            .await
            .and_then(|out| parse_duration(&out));
        let geometry = self
            .query(&GEOMETRY_ARGS, path)
            .await
            .map(|out| parse_geometry(&out))
            .unwrap_or_default();

        if duration.is_none() {
            warn!(
                "Unknown duration for {}, progress falls back to {}s",
                path.display(),
                FALLBACK_DURATION_SECS
            );
        }
        debug!("Probed {}: {:?} {:?}", path.display(), duration, geometry);

        ProbeReport { duration, geometry }
    }
}

/// Parse the bare duration output (`123.456000`). `N/A` and garbage give `None`.
pub fn parse_duration(output: &str) -> Option<f64> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|d| d.is_finite())
}

/// Parse keyed geometry output:
///
/// ```text
/// width=1920
/// height=1080
/// TAG:rotate=90
/// rotation=-90
/// ```
///
/// The legacy `rotate` tag is clockwise; display-matrix `rotation` side data
/// is counter-clockwise, so it is negated. The tag wins when both are present.
pub fn parse_geometry(output: &str) -> VideoGeometry {
    let mut geometry = VideoGeometry::default();
    let mut tag_rotation = None;
    let mut side_rotation = None;

    for line in output.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "width" if geometry.width.is_none() => geometry.width = value.parse().ok(),
            "height" if geometry.height.is_none() => geometry.height = value.parse().ok(),
            "TAG:rotate" => tag_rotation = parse_degrees(value),
            "rotation" => side_rotation = parse_degrees(value).and_then(i64::checked_neg),
            _ => {}
        }
    }

    geometry.rotation = tag_rotation.or(side_rotation).map(normalize_rotation);
    geometry
}

fn parse_degrees(value: &str) -> Option<i64> {
    value
        .parse::<i64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().filter(|d| d.is_finite()).map(|d| d.round() as i64))
}
