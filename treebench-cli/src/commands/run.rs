// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `treebench run` command - Execute the sweep and persist the results.

use std::path::Path;

use anyhow::Context;
use treebench_core::archive::partial_path;
use treebench_core::{BenchError, MeasurementRunner, ProcessAdapter, ResultArchive};

use super::{load_config, plan, SelectionArgs};
use crate::progress::ConsoleProgress;

pub async fn execute(
    config_path: &Path,
    selection: &SelectionArgs,
    keep_partial: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let config = load_config(config_path, selection)?;

    if dry_run {
        plan::print_plan(&config);
        return Ok(());
    }

    let self_exe = std::env::current_exe().context("locating the treebench executable")?;
    let adapter = ProcessAdapter::from_config(&config, &self_exe);
    let interrupt = adapter.interrupt_handle();
    let replicates = config.sweep.replicates;
    let output = config.sweep.output.clone();
    let runner = MeasurementRunner::new(adapter, config.artifacts(), replicates);
    let matrix = config.matrix();

    tracing::info!(
        config = %config_path.display(),
        output = %output.display(),
        "Starting benchmark run"
    );

    let mut progress = ConsoleProgress::default();
    let outcome = tokio::select! {
        outcome = runner.run(&matrix, &mut progress) => Some(outcome),
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl+C")?;
            None
        }
    };

    let Some(outcome) = outcome else {
        // Adapters run in their own process group, so the terminal's SIGINT never reaches them.
        if let Some(pgid) = interrupt.kill_active() {
            tracing::warn!(pgid, "Interrupted, killed running adapter");
        }
        progress.finish_line();
        anyhow::bail!("Sweep interrupted; no results written");
    };

    match outcome {
        Ok(results) => {
            ResultArchive::complete(results, replicates).save(&output)?;
            println!("Results written to {}", output.display());
            Ok(())
        }
        Err(BenchError::Sweep(mut failure)) => {
            progress.finish_line();
            if keep_partial {
                let path = partial_path(&output);
                let partial = std::mem::take(&mut failure.partial);
                ResultArchive::incomplete(partial, replicates).save(&path)?;
                eprintln!("Partial results (incomplete) written to {}", path.display());
            }
            Err(BenchError::Sweep(failure).into())
        }
        Err(e) => {
            progress.finish_line();
            Err(e.into())
        }
    }
}
