// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `treebench validate` command - Validate configuration file.

use std::path::Path;

use treebench_core::{AdapterKind, ConfigLoader};

use super::check_builtins;

pub fn execute(file: &Path) -> anyhow::Result<()> {
    tracing::info!(file = %file.display(), "Validating configuration");

    let config = ConfigLoader::load_file(file)?;
    check_builtins(&config)?;

    println!("✓ Configuration is valid");
    println!();
    println!("Sweep Settings:");
    println!("  Replicates:       {}", config.sweep.replicates);
    println!("  Timeout:          {}s", config.sweep.timeout.as_secs());
    println!("  Data Directory:   {}", config.sweep.data_dir.display());
    println!("  Artifact Pattern: {}", config.sweep.artifact_pattern);
    println!("  Output:           {}", config.sweep.output.display());
    println!();
    println!("Libraries ({}):", config.libraries.len());
    for library in &config.libraries {
        match &library.adapter {
            AdapterKind::Builtin => println!("  - {} (builtin)", library.id),
            AdapterKind::Command { program, args } => {
                println!("  - {} ({} {})", library.id, program, args.join(" "))
            }
        }
    }
    println!();
    println!("Tasks ({}):", config.sizes.len());
    for (task, sizes) in &config.sizes {
        let sizes: Vec<String> = sizes.iter().map(|s| s.to_string()).collect();
        println!("  - {}: [{}]", task, sizes.join(", "));
    }
    if !config.exclusions.is_empty() {
        println!();
        println!("Exclusions ({}):", config.exclusions.len());
        for (task, library, max) in config.exclusions.iter() {
            println!("  - {} / {}: up to {} leaves", task, library, max);
        }
    }
    println!();
    println!("Matrix: {} cell(s)", config.matrix().len());

    Ok(())
}
