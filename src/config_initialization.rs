//! Configuration initialization and hierarchy management

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::adapters::toml_config::RecodeConfig;
use crate::cli::Cli;

/// Build the effective configuration following precedence:
/// CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(
    cli: &Cli,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<RecodeConfig> {
    let mut config = match &cli.config {
        Some(path) => RecodeConfig::load(Path::new(path))
            .with_context(|| format!("Cannot use configuration file {}", path))?,
        None => RecodeConfig::load_default(&lookup).context("Cannot load configuration")?,
    };

    config
        .apply_env(&lookup)
        .context("Invalid environment override")?;
    apply_cli_configuration_overrides(&mut config, cli);

    config.validate().context("Invalid configuration")?;
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

/// Apply the global CLI flags on top of file and environment values
fn apply_cli_configuration_overrides(config: &mut RecodeConfig, cli: &Cli) {
    if let Some(encoder) = &cli.encoder {
        config.tools.encoder = encoder.clone();
    }
    if let Some(prober) = &cli.prober {
        config.tools.prober = prober.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.log_json {
        config.logging.json = true;
    }
}
