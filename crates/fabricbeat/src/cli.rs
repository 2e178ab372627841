//! Clap derive structures for the `fabricbeat` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fabricbeat -- fabric telemetry collector
#[derive(Debug, Parser)]
#[command(
    name = "fabricbeat",
    version,
    about = "Collect network-fabric telemetry and index it into Elasticsearch",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Directory holding per-collector configuration files
    #[arg(long, env = "FABRICBEAT_CONFIG_DIR", default_value = "configs", global = true)]
    pub config_dir: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify configuration and run one collection without posting
    Test(TestArgs),

    /// Start the collector and POST data on the configured interval
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct TestArgs {
    /// Collector name; configuration is read from <config-dir>/<name>.yaml
    #[arg(long)]
    pub name: String,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Collector name; configuration is read from <config-dir>/<name>.yaml
    #[arg(long)]
    pub name: String,

    /// Collect and POST once, then exit
    #[arg(long)]
    pub run_once: bool,
}
