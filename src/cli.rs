//! Command-line interface definitions using clap

use clap::Parser;
use std::path::PathBuf;

/// user-watch - ComfyUI bootstrap sidecar for Agones game servers
#[derive(Parser, Debug)]
#[command(name = "user-watch")]
#[command(version)]
#[command(
    about = "Links shared model storage, then waits for an Agones user label and links per-user directories",
    long_about = None
)]
pub struct Cli {
    /// Path to a TOML configuration file (default: ./sidecar.toml if present)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Print a sample configuration file with all defaults and exit
    #[arg(long)]
    pub generate_config: bool,
}
