// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Treebench CLI
//!
//! Command-line interface for process-isolated phylogenetic tree library
//! benchmarks.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use treebench_core::config::DEFAULT_CONFIG_FILE;

mod commands;
mod progress;

use commands::SelectionArgs;

/// Treebench - Benchmark sweeps over phylogenetic tree libraries
#[derive(Parser)]
#[command(name = "treebench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full sweep and write the result archive
    Run {
        #[command(flatten)]
        selection: SelectionArgs,

        /// On a fatal failure, save completed cells to <output>.partial
        #[arg(long)]
        keep_partial: bool,

        /// Print the plan instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the enumerated task matrix without running anything
    Plan {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file (defaults to --config)
        file: Option<PathBuf>,
    },

    /// Time one task on one tree with a built-in library (adapter entry point)
    Time {
        /// Newick tree file, optionally gzip-compressed
        tree: PathBuf,

        /// Built-in library: arena or boxed
        library: String,

        /// Task: height, average_length, distance or treeness
        task: String,

        /// Seed for random leaf selection
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Write random input trees for the configured sizes
    Generate {
        /// Leaf counts to generate (defaults to every configured size)
        #[arg(short, long = "size", value_name = "LEAVES")]
        sizes: Vec<u32>,

        /// Seed for reproducible fixtures
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Summarize a result archive
    Summary {
        /// Archive written by `treebench run`
        archive: PathBuf,

        /// Only show this task
        #[arg(short, long)]
        task: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging. Stdout is reserved for command output.
    let log_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Commands::Time { .. }, false) => "warn",
        _ => "info",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            selection,
            keep_partial,
            dry_run,
        } => commands::run::execute(&cli.config, &selection, keep_partial, dry_run).await,
        Commands::Plan { selection } => commands::plan::execute(&cli.config, &selection),
        Commands::Validate { file } => {
            commands::validate::execute(file.as_deref().unwrap_or(&cli.config))
        }
        Commands::Time {
            tree,
            library,
            task,
            seed,
        } => commands::time::execute(&tree, &library, &task, seed),
        Commands::Generate { sizes, seed } => commands::generate::execute(&cli.config, &sizes, seed),
        Commands::Summary { archive, task } => {
            commands::summary::execute(&archive, task.as_deref())
        }
    }
}
