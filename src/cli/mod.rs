//! CLI module for Recoder
//!
//! This module handles command-line argument parsing and command execution.

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;
pub mod observer;

/// Recoder batch transcoder
///
/// Converts video files to an edit-friendly intermediate format through an
/// external encoder, with live progress and pause/resume/stop control.
#[derive(Parser, Debug)]
#[command(name = "recoder")]
#[command(about = "Recoder - batch video transcoding with pause, resume and stop")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to the XDG/home config or ./recoder.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Encoder binary
    #[arg(long, global = true)]
    pub encoder: Option<String>,

    /// Prober binary
    #[arg(long, global = true)]
    pub prober: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcode files and folders as one batch
    Run(args::RunArgs),
    /// Show what a file would be transcoded with
    Probe(args::ProbeArgs),
}
