// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `treebench plan` command - Show the task matrix without running it.

use std::path::Path;

use treebench_core::Config;

use super::{load_config, SelectionArgs};

pub fn execute(config_path: &Path, selection: &SelectionArgs) -> anyhow::Result<()> {
    let config = load_config(config_path, selection)?;
    print_plan(&config);
    Ok(())
}

pub fn print_plan(config: &Config) {
    let matrix = config.matrix();
    let artifacts = config.artifacts();

    println!("{:<16} {:>10}  {:<16} ARTIFACT", "TASK", "LEAVES", "LIBRARY");
    for cell in &matrix {
        let path = artifacts.path_for(cell.size);
        let marker = if path.is_file() { "" } else { "  (missing)" };
        println!(
            "{:<16} {:>10}  {:<16} {}{}",
            cell.task.name(),
            cell.size.leaves(),
            cell.library.as_str(),
            path.display(),
            marker
        );
    }

    let replicates = u64::from(config.sweep.replicates);
    println!();
    println!(
        "{} cell(s) x {} replicate(s) = {} invocation(s)",
        matrix.len(),
        replicates,
        matrix.len() as u64 * replicates
    );
    println!("Per-invocation timeout: {}s", config.sweep.timeout.as_secs());
    println!("Output: {}", config.sweep.output.display());
}
