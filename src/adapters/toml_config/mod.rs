// TOML config adapter - typed configuration with file, environment and defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::errors::DomainError;
use crate::domain::model::{EncodeProfile, ErrorPolicy};
use crate::engine::job::DEFAULT_STOP_GRACE;
use crate::error::{RecodeError, RecodeResult};
use crate::utils::path::{OutputTemplate, DEFAULT_OUTPUT_TEMPLATE};

/// Environment variables consulted after the config file
pub const ENV_ENCODER: &str = "RECODER_ENCODER";
pub const ENV_PROBER: &str = "RECODER_PROBER";
pub const ENV_OUTPUT_TEMPLATE: &str = "RECODER_OUTPUT_TEMPLATE";
pub const ENV_ON_ERROR: &str = "RECODER_ON_ERROR";
pub const ENV_LOG_LEVEL: &str = "RECODER_LOG_LEVEL";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecodeConfig {
    pub tools: ToolsConfig,
    pub output: OutputConfig,
    pub profile: EncodeProfile,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub encoder: String,
    pub prober: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            encoder: "ffmpeg".to_string(),
            prober: "ffprobe".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub folder_template: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub on_error: ErrorPolicy,
    /// Seconds a stopped encoder gets to exit before it is killed
    pub stop_grace_secs: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            on_error: ErrorPolicy::default(),
            stop_grace_secs: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl RecodeConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> RecodeResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file that must exist
    pub fn load(path: &Path) -> RecodeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RecodeError::ConfigError {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        info!("Loading configuration from {}", path.display());
        Self::from_toml(&content)
    }

    /// Load from the first default location that exists, or defaults
    pub fn load_default(lookup: impl Fn(&str) -> Option<String>) -> RecodeResult<Self> {
        for candidate in default_config_paths(&lookup) {
            if candidate.is_file() {
                return Self::load(&candidate);
            }
        }
        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), DomainError> {
        if let Some(encoder) = lookup(ENV_ENCODER) {
            self.tools.encoder = encoder;
        }
        if let Some(prober) = lookup(ENV_PROBER) {
            self.tools.prober = prober;
        }
        if let Some(template) = lookup(ENV_OUTPUT_TEMPLATE) {
            self.output.folder_template = template;
        }
        if let Some(policy) = lookup(ENV_ON_ERROR) {
            self.batch.on_error = ErrorPolicy::parse(&policy)?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate values that serde cannot check
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.tools.encoder.trim().is_empty() || self.tools.prober.trim().is_empty() {
            return Err(DomainError::BadArgs("Tool paths cannot be empty".to_string()));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(DomainError::BadArgs(format!(
                "Invalid log level: {}. Valid levels: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        if Duration::try_from_secs_f64(self.batch.stop_grace_secs).is_err() {
            return Err(DomainError::BadArgs(format!(
                "Invalid stop grace: {}",
                self.batch.stop_grace_secs
            )));
        }
        self.profile.validate()?;
        self.output_template()?;
        Ok(())
    }

    /// Grace period before a stopped encoder is killed
    pub fn stop_grace(&self) -> Duration {
        Duration::try_from_secs_f64(self.batch.stop_grace_secs).unwrap_or(DEFAULT_STOP_GRACE)
    }

    /// Parsed output folder template
    pub fn output_template(&self) -> Result<OutputTemplate, DomainError> {
        OutputTemplate::parse(&self.output.folder_template)
    }
}

/// Default config file locations, most specific first
pub fn default_config_paths(lookup: &dyn Fn(&str) -> Option<String>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(xdg) = lookup("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        paths.push(PathBuf::from(xdg).join("recoder").join("config.toml"));
    }
    if let Some(home) = lookup("HOME").filter(|v| !v.is_empty()) {
        paths.push(PathBuf::from(home).join(".config").join("recoder").join("config.toml"));
    }
    paths.push(PathBuf::from("recoder.toml"));
    paths
}
