//! Input collection and output path resolution

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;
use walkdir::WalkDir;

use crate::domain::errors::DomainError;
use crate::domain::rules::is_supported_media;
use crate::error::{RecodeError, RecodeResult};

/// Default output folder, relative to each input's parent directory
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "transcoded";

static TEMPLATE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w\s\-./~${}]+$").expect("valid template charset regex"));
static TEMPLATE_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("valid template variable regex"));
static VARIABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("valid variable name regex"));

const KNOWN_VARIABLES: [&str; 2] = ["parent", "stem"];

/// Output folder template, e.g. `transcoded` or `~/renders/{{parent}}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTemplate {
    raw: String,
}

impl Default for OutputTemplate {
    fn default() -> Self {
        Self {
            raw: DEFAULT_OUTPUT_TEMPLATE.to_string(),
        }
    }
}

impl OutputTemplate {
    /// Validate and wrap a template string
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.is_empty() || !TEMPLATE_CHARS.is_match(raw) {
            return Err(DomainError::BadArgs(format!(
                "Output template contains unsupported characters: {:?}",
                raw
            )));
        }
        if raw.matches("{{").count() != raw.matches("}}").count() {
            return Err(DomainError::BadArgs(format!(
                "Unbalanced braces in output template: {}",
                raw
            )));
        }
        for capture in TEMPLATE_VARIABLE.captures_iter(raw) {
            let name = &capture[1];
            if !VARIABLE_NAME.is_match(name) || !KNOWN_VARIABLES.contains(&name) {
                return Err(DomainError::BadArgs(format!(
                    "Unknown output template variable: {{{{{}}}}}",
                    name
                )));
            }
        }
        if raw.contains("//") {
            return Err(DomainError::BadArgs(format!(
                "Output template contains an empty path segment: {}",
                raw
            )));
        }

        Ok(Self {
            raw: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Directory that receives the transcoded version of `input`
    pub fn resolve(&self, input: &Path) -> PathBuf {
        let parent = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let parent_name = parent
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let expanded = self
            .raw
            .replace("{{parent}}", &parent_name)
            .replace("{{stem}}", &stem);

        let expanded = match (expanded.strip_prefix("~/"), std::env::var_os("HOME")) {
            (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
            _ => PathBuf::from(expanded),
        };

        if expanded.is_absolute() {
            expanded
        } else {
            parent.join(expanded)
        }
    }

    /// Full output path: resolved directory, input stem, profile extension
    pub fn output_path(&self, input: &Path, extension: &str) -> PathBuf {
        output_file_in(&self.resolve(input), input, extension)
    }
}

/// Output file for `input` inside `dir` with its extension replaced
pub fn output_file_in(dir: &Path, input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    dir.join(format!("{}.{}", stem, extension))
}

/// Turn a command-line or pasted input into a filesystem path.
/// `file://` URIs are accepted and percent-decoded; anything else is taken
/// as a plain path.
pub fn input_to_path(input: &str) -> PathBuf {
    let trimmed = input.trim();
    match Url::parse(trimmed) {
        Ok(url) if url.scheme() == "file" => url.to_file_path().unwrap_or_else(|()| {
            debug!("{} is not a local file URI, using it as a path", trimmed);
            PathBuf::from(trimmed)
        }),
        _ => PathBuf::from(trimmed),
    }
}

/// Expand inputs into the ordered list of media files for a batch.
///
/// Files are kept in argument order; directories contribute their direct
/// children (not recursive), sorted by name. Unsupported files are skipped.
pub fn collect_media_files<S: AsRef<str>>(inputs: &[S]) -> RecodeResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let path = input_to_path(input.as_ref());
        if !path.exists() {
            return Err(RecodeError::InputNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        if path.is_dir() {
            for entry in WalkDir::new(&path)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
            {
                let entry = entry.map_err(|e| RecodeError::IoError(e.into()))?;
                if entry.file_type().is_file() && is_supported_media(entry.path()) {
                    files.push(entry.into_path());
                } else {
                    debug!("Skipping {}", entry.path().display());
                }
            }
        } else if is_supported_media(&path) {
            files.push(path);
        } else {
            debug!("Skipping unsupported input {}", path.display());
        }
    }

    if files.is_empty() {
        return Err(RecodeError::NoMediaFiles);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_template_is_sibling_transcoded_dir() {
        let template = OutputTemplate::default();
        assert_eq!(
            template.resolve(Path::new("/videos/trip/clip.mp4")),
            PathBuf::from("/videos/trip/transcoded")
        );
        assert_eq!(
            template.output_path(Path::new("/videos/trip/clip.MP4"), "mov"),
            PathBuf::from("/videos/trip/transcoded/clip.mov")
        );
    }

    #[test]
    fn test_template_variables_and_absolute_paths() {
        let template = OutputTemplate::parse("/renders/{{parent}}/{{stem}}").unwrap();
        assert_eq!(
            template.resolve(Path::new("/videos/trip/clip.mkv")),
            PathBuf::from("/renders/trip/clip")
        );
    }

    #[test]
    fn test_relative_input_without_parent() {
        let template = OutputTemplate::default();
        assert_eq!(
            template.output_path(Path::new("clip.avi"), "mov"),
            PathBuf::from("./transcoded/clip.mov")
        );
    }

    #[test]
    fn test_template_validation() {
        assert!(OutputTemplate::parse("transcoded").is_ok());
        assert!(OutputTemplate::parse("~/out/{{parent}}").is_ok());
        assert!(OutputTemplate::parse("out/{{nope}}").is_err());
        assert!(OutputTemplate::parse("out/{{parent}").is_err());
        assert!(OutputTemplate::parse("out//x").is_err());
        assert!(OutputTemplate::parse("out|x").is_err());
        assert!(OutputTemplate::parse("   ").is_err());
    }

    #[test]
    fn test_input_to_path_handles_uris() {
        assert_eq!(input_to_path("/a/b.mp4"), PathBuf::from("/a/b.mp4"));
        assert_eq!(
            input_to_path("file:///home/me/My%20Clip.mov\n"),
            PathBuf::from("/home/me/My Clip.mov")
        );
        assert_eq!(input_to_path("file:///a/100%"), PathBuf::from("/a/100%"));
        assert_eq!(input_to_path("clips/a.mp4"), PathBuf::from("clips/a.mp4"));
    }

    #[cfg(unix)]
    #[test]
    fn test_input_to_path_uri_edge_cases() {
        // Not a valid escape, kept literally
        assert_eq!(
            input_to_path("file:///tmp/a%+5b.mp4"),
            PathBuf::from("/tmp/a%+5b.mp4")
        );
        assert_eq!(
            input_to_path("file://localhost/tmp/clip.mp4"),
            PathBuf::from("/tmp/clip.mp4")
        );
        assert_eq!(
            input_to_path("file://server/share/clip.mp4"),
            PathBuf::from("file://server/share/clip.mp4")
        );
    }

    #[test]
    fn test_collect_expands_directory_non_recursively() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.MOV"), b"x").unwrap();
        fs::write(dir.path().join("a.mp4"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.mkv"), b"x").unwrap();

        let files = collect_media_files(&[dir.path().to_string_lossy().to_string()]).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.mp4"), dir.path().join("b.MOV")]
        );
    }

    #[test]
    fn test_collect_keeps_argument_order() {
        let dir = TempDir::new().unwrap();
        let second = dir.path().join("z.avi");
        let first = dir.path().join("y.mkv");
        fs::write(&second, b"x").unwrap();
        fs::write(&first, b"x").unwrap();

        let inputs = vec![
            second.to_string_lossy().to_string(),
            first.to_string_lossy().to_string(),
        ];
        assert_eq!(collect_media_files(&inputs).unwrap(), vec![second, first]);
    }

    #[test]
    fn test_collect_errors() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("readme.md"), b"x").unwrap();

        let missing = dir.path().join("missing.mp4").to_string_lossy().to_string();
        assert!(matches!(
            collect_media_files(&[missing]),
            Err(RecodeError::InputNotFound { .. })
        ));
        assert!(matches!(
            collect_media_files(&[dir.path().to_string_lossy().to_string()]),
            Err(RecodeError::NoMediaFiles)
        ));
    }
}
