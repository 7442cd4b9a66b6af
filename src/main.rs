//! Recoder CLI
//!
//! Batch video transcoding to an edit-friendly intermediate format, with live
//! progress and interactive pause/resume/stop.
//!
//! # Usage
//!
//! ```bash
//! recoder run ~/footage/day1 extra.mov
//! recoder run clips/ --continue-on-error --output-template "~/renders/{{parent}}"
//! recoder probe phone.mp4 --json
//! ```

use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use recoder::adapters::init_tracing;
use recoder::cli::{commands, Cli, Commands};
use recoder::config_initialization::initialize_configuration_hierarchy;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match initialize_configuration_hierarchy(&cli, |key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&config.logging.level, config.logging.json) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting Recoder");

    let result = match cli.command {
        Commands::Run(args) => commands::run(args, config).await.map(commands::exit_code),
        Commands::Probe(args) => commands::probe(args, config).await.map(|()| 0),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
