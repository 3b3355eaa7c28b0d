//! Command-line interface

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::config::{Config, humantime_serde};

/// Zero-time coalescing cache - compare direct reads against coalesced reads
#[derive(Parser, Debug)]
#[command(name = "zerotime-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "ZEROTIME_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "ZEROTIME_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "ZEROTIME_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to demo)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the visibility harness for every strategy (default)
    Demo(DemoArgs),

    /// Print the effective configuration as YAML
    Config,
}

/// Overrides for the demo harness
#[derive(clap::Args, Debug, Default)]
pub struct DemoArgs {
    /// Concurrent worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Add-then-read rounds per worker
    #[arg(short, long)]
    pub rounds: Option<usize>,

    /// Delay for the delayed strategy (e.g. "1ms", "2s")
    #[arg(short, long, value_parser = humantime_serde::parse)]
    pub delay: Option<Duration>,

    /// Print reports as JSON
    #[arg(long)]
    pub json: bool,
}

impl DemoArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(workers) = self.workers {
            config.harness.workers = workers;
        }
        if let Some(rounds) = self.rounds {
            config.harness.rounds = rounds;
        }
        if let Some(delay) = self.delay {
            config.harness.delay = delay;
        }
    }
}
