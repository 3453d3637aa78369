// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use treebench_core::{Config, ConfigError, ConfigLoader};
use treebench_native::NativeLibrary;

pub mod generate;
pub mod plan;
pub mod run;
pub mod summary;
pub mod time;
pub mod validate;

/// Flags that narrow or override the configured sweep.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Only run this task (repeatable)
    #[arg(short, long = "task", value_name = "TASK")]
    pub tasks: Vec<String>,

    /// Only run this library (repeatable)
    #[arg(short, long = "library", value_name = "ID")]
    pub libraries: Vec<String>,

    /// Override the replicate count
    #[arg(short, long)]
    pub replicates: Option<u32>,

    /// Override the per-invocation timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Override the result archive path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Load the configuration and apply command-line selections.
pub fn load_config(path: &Path, selection: &SelectionArgs) -> anyhow::Result<Config> {
    let mut config = ConfigLoader::load_file(path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;

    config.select_tasks(&selection.tasks)?;
    config.select_libraries(&selection.libraries)?;
    if let Some(replicates) = selection.replicates {
        config.set_replicates(replicates)?;
    }
    if let Some(secs) = selection.timeout {
        config.set_timeout_secs(secs)?;
    }
    if let Some(output) = &selection.output {
        config.sweep.output = output.clone();
    }

    check_builtins(&config)?;
    Ok(config)
}

/// Built-in libraries must name one of the native implementations.
pub fn check_builtins(config: &Config) -> Result<(), ConfigError> {
    for id in config.builtin_libraries() {
        if id.as_str().parse::<NativeLibrary>().is_err() {
            return Err(ConfigError::InvalidFieldValue {
                field: "builtin",
                value: id.to_string(),
                reason: format!(
                    "Built-in libraries are {}",
                    NativeLibrary::ALL.map(|l| l.name()).join(", ")
                ),
            });
        }
    }
    Ok(())
}
