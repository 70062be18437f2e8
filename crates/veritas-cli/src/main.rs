//! `veritas` -- CLI binary for the news verification pipeline.
//!
//! Provides the following subcommands:
//!
//! - `veritas run` -- Verify a single item (from a JSON file or the built-in samples).
//! - `veritas demo` -- Run a batch of sample items and show metrics tables.
//! - `veritas train` -- Run a batch, analyze agent performance, persist adjustments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

/// veritas news verification CLI.
#[derive(Parser)]
#[command(name = "veritas", about = "Multi-agent news verification pipeline", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Append pipeline records to this JSONL file.
    #[arg(long, global = true)]
    metrics_log: Option<PathBuf>,

    /// Training file holding persisted per-agent adjustments.
    #[arg(long, global = true, default_value = "training.json")]
    training_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Verify a single news item.
    Run {
        /// JSON file holding the item; omit to use a built-in sample.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print the full pipeline result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run a batch of sample items and show the metrics tables.
    Demo {
        /// How many sample items to process.
        #[arg(short, long, default_value = "5")]
        count: usize,
    },

    /// Run a batch, analyze agent performance, and persist adjustments.
    Train {
        /// How many sample items to process before analyzing.
        #[arg(short, long, default_value = "9")]
        count: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let ctx = commands::Context::new(cli.metrics_log, cli.training_file);
    match cli.command {
        Commands::Run { input, json } => commands::run(&ctx, input.as_deref(), json)?,
        Commands::Demo { count } => commands::demo(&ctx, count)?,
        Commands::Train { count } => commands::train(&ctx, count)?,
    }

    Ok(())
}
