//! Command-line argument definitions

use clap::Args;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Input files or folders (folders are expanded one level deep)
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Output folder template, e.g. "transcoded" or "~/renders/{{parent}}"
    #[arg(short, long)]
    pub output_template: Option<String>,

    /// Keep going after a file fails
    #[arg(long)]
    pub continue_on_error: bool,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Input video file path
    pub input: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
