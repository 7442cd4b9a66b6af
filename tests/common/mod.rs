//! Stand-in encoder and prober scripts shared by the integration tests

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Fake encoder. Writes its own arguments to the output file.
/// Inputs named `*fail*` exit 1, `*slow*` leave a partial output and block,
/// `*stubborn*` do the same but ignore SIGTERM.
const ENCODER: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version fake"
  exit 0
fi
in="$3"
for arg; do out="$arg"; done
case "$in" in
  *fail*)
    echo "$in: Invalid data found when processing input" >&2
    exit 1
    ;;
  *slow*)
    echo partial > "$out"
    echo "frame=   15 fps=0.0 time=00:00:00.50 bitrate=N/A speed=1x" >&2
    exec sleep 30
    ;;
  *stubborn*)
    trap '' TERM
    echo partial > "$out"
    echo "frame=   15 fps=0.0 time=00:00:00.50 bitrate=N/A speed=1x" >&2
    while true; do sleep 0.1; done
    ;;
esac
echo "frame=   30 fps=0.0 time=00:00:01.00 bitrate=N/A speed=1x" >&2
echo "frame=   60 fps=0.0 time=00:00:02.00 bitrate=N/A speed=1x" >&2
echo "$*" > "$out"
"#;

/// Fake prober: two seconds of portrait video tagged with a 90 degree rotation
const PROBER: &str = r#"#!/bin/sh
case "$*" in
  *format=duration*) echo "2.000000" ;;
  *) printf 'width=1080\nheight=1920\nTAG:rotate=90\n' ;;
esac
"#;

pub struct FakeTools {
    _dir: TempDir,
    pub encoder: PathBuf,
    pub prober: PathBuf,
}

/// Written once, before any test spawns a process, so no child inherits a
/// script still open for writing.
pub static TOOLS: Lazy<FakeTools> = Lazy::new(|| {
    let dir = TempDir::new().unwrap();
    let encoder = write_script(dir.path(), "ffmpeg", ENCODER);
    let prober = write_script(dir.path(), "ffprobe", PROBER);
    FakeTools {
        _dir: dir,
        encoder,
        prober,
    }
});

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Create an input file the batch can refer to
pub fn media(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"not really video").unwrap();
    path
}
