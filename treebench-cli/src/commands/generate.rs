// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `treebench generate` command - Write random input trees.

use std::path::Path;

use anyhow::{bail, Context};
use rand::rngs::StdRng;
use rand::SeedableRng;
use treebench_core::{ConfigLoader, InputSize};
use treebench_native::newick::write_tree;
use treebench_native::random_tree;

pub fn execute(config_path: &Path, sizes: &[u32], seed: Option<u64>) -> anyhow::Result<()> {
    let config = ConfigLoader::load_file(config_path)?;
    let artifacts = config.artifacts();

    let sizes = if sizes.is_empty() {
        config.all_sizes()
    } else {
        sizes
            .iter()
            .map(|&n| InputSize::new(n))
            .collect::<Result<Vec<_>, _>>()?
    };
    if sizes.is_empty() {
        bail!("no input sizes configured; pass --size");
    }

    std::fs::create_dir_all(artifacts.data_dir()).with_context(|| {
        format!("creating data directory {}", artifacts.data_dir().display())
    })?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    for size in sizes {
        let path = artifacts.path_for(size);
        let tree = random_tree(size.leaves(), &mut rng);
        write_tree(&path, &tree)?;
        tracing::debug!(leaves = size.leaves(), path = %path.display(), "Tree written");
        println!("✓ {} leaves -> {}", size, path.display());
    }

    Ok(())
}
