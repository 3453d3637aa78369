// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Task matrix construction.
//!
//! Enumerates {task × input size × library} in a fixed order: tasks in
//! declaration order, sizes ascending, libraries in configuration order.
//! Exclusion rules cap the input size per (task, library) pair.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{InputSize, LibraryId, Task};

/// One (task, input size, library) triple to measure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatrixCell {
    pub task: Task,
    pub size: InputSize,
    pub library: LibraryId,
}

impl fmt::Display for MatrixCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "task={} size={} library={}",
            self.task, self.size, self.library
        )
    }
}

/// Per-(task, library) maximum input sizes.
///
/// Sizes strictly greater than the maximum are skipped. A pair without a
/// rule runs every configured size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionRules {
    caps: BTreeMap<(Task, LibraryId), InputSize>,
}

impl ExclusionRules {
    /// Create an empty rule table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap `library` at `max` leaves for `task`. Replaces any earlier cap.
    pub fn insert(&mut self, task: Task, library: LibraryId, max: InputSize) {
        self.caps.insert((task, library), max);
    }

    /// Builder-style [`ExclusionRules::insert`].
    pub fn with_rule(mut self, task: Task, library: LibraryId, max: InputSize) -> Self {
        self.insert(task, library, max);
        self
    }

    /// The cap for a pair, if any.
    pub fn max_size(&self, task: Task, library: &LibraryId) -> Option<InputSize> {
        // BTreeMap lookups on a tuple key need an owned tuple.
        self.caps.get(&(task, library.clone())).copied()
    }

    /// Whether `size` may be measured for the pair.
    pub fn allows(&self, task: Task, library: &LibraryId, size: InputSize) -> bool {
        self.max_size(task, library).map_or(true, |max| size <= max)
    }

    /// All rules in (task, library) order.
    pub fn iter(&self) -> impl Iterator<Item = (Task, &LibraryId, InputSize)> + '_ {
        self.caps
            .iter()
            .map(|((task, library), max)| (*task, library, *max))
    }

    pub fn len(&self) -> usize {
        self.caps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }
}

/// Ordered enumeration of the triples a sweep will measure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskMatrix {
    cells: Vec<MatrixCell>,
}

impl TaskMatrix {
    /// Build the matrix.
    ///
    /// Sizes are visited in ascending order regardless of how they were
    /// listed; duplicates collapse to one entry. A task with no sizes
    /// contributes nothing.
    pub fn build(
        sizes: &BTreeMap<Task, Vec<InputSize>>,
        libraries: &[LibraryId],
        exclusions: &ExclusionRules,
    ) -> Self {
        let mut cells = Vec::new();

        for (&task, task_sizes) in sizes {
            let mut ordered = task_sizes.clone();
            ordered.sort_unstable();
            ordered.dedup();

            for size in ordered {
                for library in libraries {
                    if !exclusions.allows(task, library, size) {
                        tracing::trace!(%task, %size, %library, "Excluded by size cap");
                        continue;
                    }
                    cells.push(MatrixCell {
                        task,
                        size,
                        library: library.clone(),
                    });
                }
            }
        }

        tracing::debug!(cells = cells.len(), "Task matrix built");
        Self { cells }
    }

    /// Cells in enumeration order.
    pub fn cells(&self) -> &[MatrixCell] {
        &self.cells
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatrixCell> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Distinct input sizes referenced by any cell, ascending.
    pub fn input_sizes(&self) -> Vec<InputSize> {
        let mut sizes: Vec<_> = self.cells.iter().map(|c| c.size).collect();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }
}

impl<'a> IntoIterator for &'a TaskMatrix {
    type Item = &'a MatrixCell;
    type IntoIter = std::slice::Iter<'a, MatrixCell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}
