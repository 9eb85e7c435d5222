//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "relaygate", about = "Module gateway host", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a gateway from a configuration file and run until ctrl-c or SIGTERM
    Run(RunOpts),
    /// Validate a configuration file without loading any module
    Check(CheckOpts),
}

#[derive(clap::Args)]
pub struct RunOpts {
    /// Gateway configuration file (JSON)
    #[arg(long, short = 'c', env = "RELAYGATE_CONFIG")]
    pub config: PathBuf,
}

#[derive(clap::Args)]
pub struct CheckOpts {
    /// Gateway configuration file (JSON)
    #[arg(long, short = 'c', env = "RELAYGATE_CONFIG")]
    pub config: PathBuf,

    /// Print the resolved configuration as JSON
    #[arg(long)]
    pub json: bool,
}
