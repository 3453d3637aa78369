// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `treebench summary` command - Describe a result archive.

use std::path::Path;

use treebench_core::stats::format_seconds;
use treebench_core::{ResultArchive, SampleSummary, Task};

pub fn execute(archive_path: &Path, task: Option<&str>) -> anyhow::Result<()> {
    let only: Option<Task> = task.map(str::parse::<Task>).transpose()?;
    let archive = ResultArchive::load(archive_path)?;

    println!("Archive:    {}", archive_path.display());
    println!(
        "Status:     {}",
        if archive.complete {
            "complete"
        } else {
            "INCOMPLETE (partial sweep)"
        }
    );
    println!("Replicates: {}", archive.replicates);
    println!("Created:    {}", archive.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!(
        "Host:       {} ({} {}, {} x {})",
        archive.system.hostname,
        archive.system.os,
        archive.system.os_version,
        archive.system.cpu_cores,
        archive.system.cpu_model
    );

    let incomplete = archive.results.incomplete_paths(archive.replicates as usize);
    if !incomplete.is_empty() {
        println!("Warning:    {} path(s) with a partial sample count", incomplete.len());
    }

    for task in archive.results.tasks() {
        if only.is_some_and(|t| t != task) {
            continue;
        }
        println!();
        println!("=== {} ===", task);
        println!(
            "{:>10}  {:<16} {:>3} {:>10} {:>10} {:>10} {:>10}",
            "LEAVES", "LIBRARY", "N", "MEAN", "MEDIAN", "MIN", "STDDEV"
        );
        let Some(sizes) = archive.results.task(task) else {
            continue;
        };
        for (size, libraries) in sizes {
            for (library, samples) in libraries {
                match SampleSummary::from_samples(samples) {
                    Some(s) => println!(
                        "{:>10}  {:<16} {:>3} {:>10} {:>10} {:>10} {:>10}",
                        size.leaves(),
                        library.as_str(),
                        s.count,
                        format_seconds(s.mean),
                        format_seconds(s.median),
                        format_seconds(s.min),
                        format_seconds(s.std_dev)
                    ),
                    None => println!(
                        "{:>10}  {:<16} {:>3} {:>10}",
                        size.leaves(),
                        library.as_str(),
                        0,
                        "NA"
                    ),
                }
            }
        }
    }

    Ok(())
}
