// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `treebench time` command - Timing adapter for the built-in libraries.
//!
//! Prints exactly one line to stdout: elapsed seconds or `NA`.

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use treebench_core::Task;
use treebench_native::newick::read_tree_text;
use treebench_native::{time_task, NativeLibrary};

pub fn execute(tree: &Path, library: &str, task: &str, seed: Option<u64>) -> anyhow::Result<()> {
    let library: NativeLibrary = library.parse()?;
    let task: Task = task.parse()?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let text = read_tree_text(tree)?;
    let measurement = time_task(library, task, &text, &mut rng)?;
    tracing::debug!(%library, %task, %measurement, "Timed");

    // Display is the adapter wire format.
    println!("{measurement}");
    Ok(())
}
