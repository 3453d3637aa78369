// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Timing adapter logic for the native libraries.
//!
//! Parsing, conversion and leaf selection all happen before the clock
//! starts; only the requested computation is timed.

use std::fmt;
use std::hint::black_box;
use std::str::FromStr;
use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;
use treebench_core::{Measurement, Task};

use crate::boxed::BoxedNode;
use crate::error::{TreeError, TreeResult};
use crate::newick::parse;
use crate::tree::{NodeId, Tree};

/// The in-tree candidate libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeLibrary {
    /// Flat node vector with parent links.
    Arena,
    /// Recursively owned nodes, no parent links.
    Boxed,
}

impl NativeLibrary {
    pub const ALL: [NativeLibrary; 2] = [NativeLibrary::Arena, NativeLibrary::Boxed];

    pub fn name(&self) -> &'static str {
        match self {
            NativeLibrary::Arena => "arena",
            NativeLibrary::Boxed => "boxed",
        }
    }

    pub fn supports(&self, task: Task) -> bool {
        !matches!((self, task), (NativeLibrary::Boxed, Task::Distance))
    }
}

impl fmt::Display for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NativeLibrary {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NativeLibrary::ALL
            .into_iter()
            .find(|library| library.name() == s)
            .ok_or_else(|| TreeError::UnknownLibrary {
                name: s.to_string(),
            })
    }
}

/// Time one computation of `task` on the tree in `newick`.
pub fn time_task<R: Rng + ?Sized>(
    library: NativeLibrary,
    task: Task,
    newick: &str,
    rng: &mut R,
) -> TreeResult<Measurement> {
    if !library.supports(task) {
        tracing::debug!(%library, %task, "Task not supported");
        return Ok(Measurement::Unsupported);
    }

    let tree = parse(newick)?;
    let seconds = match library {
        NativeLibrary::Arena => time_arena(&tree, task, rng)?,
        NativeLibrary::Boxed => {
            let boxed = BoxedNode::from_tree(&tree);
            drop(tree);
            time_boxed(&boxed, task)
        }
    };
    Ok(Measurement::Elapsed(seconds))
}

fn time_arena<R: Rng + ?Sized>(tree: &Tree, task: Task, rng: &mut R) -> TreeResult<f64> {
    let seconds = match task {
        Task::Height => timed(|| tree.height()),
        Task::AverageLength => timed(|| tree.average_branch_length()),
        Task::Treeness => timed(|| tree.treeness()),
        Task::Distance => {
            let leaves: Vec<NodeId> = tree.leaves().collect();
            let (Some(&a), Some(&b)) = (leaves.choose(rng), leaves.choose(rng)) else {
                return Err(TreeError::NoLeaves);
            };
            timed(|| tree.distance(a, b))
        }
    };
    Ok(seconds)
}

fn time_boxed(tree: &BoxedNode, task: Task) -> f64 {
    match task {
        Task::Height => timed(|| tree.height()),
        Task::AverageLength => timed(|| tree.average_branch_length()),
        Task::Treeness => timed(|| tree.treeness()),
        // Filtered out by `supports`.
        Task::Distance => 0.0,
    }
}

fn timed(compute: impl FnOnce() -> f64) -> f64 {
    let start = Instant::now();
    black_box(compute());
    start.elapsed().as_secs_f64()
}
