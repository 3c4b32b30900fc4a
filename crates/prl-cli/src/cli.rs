use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "prl",
    about = "Pro-Rata Ledger: pro-rata payouts over a growing claim count",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a TOML scenario against an in-memory pool
    Run(RunArgs),
    /// Load a saved pool snapshot and validate it
    Inspect(InspectArgs),
    /// Print the default pool configuration
    Config,
}

#[derive(Args)]
pub struct RunArgs {
    pub scenario: PathBuf,
    /// Write the final pool snapshot here
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Args)]
pub struct InspectArgs {
    pub snapshot: PathBuf,
}
