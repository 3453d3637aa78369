// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Result set and the aggregator that fills it.
//!
//! The result set is a three-level ordered mapping
//! task → input size → library → samples (seconds, replicate order).
//! The aggregator moves from `Collecting` to `Frozen` exactly once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ResultSetError;
use crate::matrix::MatrixCell;
use crate::types::{InputSize, LibraryId, Task};

/// Samples per library for one (task, size).
pub type LibrarySamples = BTreeMap<LibraryId, Vec<f64>>;

/// Libraries per size for one task.
pub type SizeResults = BTreeMap<InputSize, LibrarySamples>;

/// Aggregated timing samples of a sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    tasks: BTreeMap<Task, SizeResults>,
}

impl ResultSet {
    /// Create an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the key path exists and return its sample sequence.
    pub fn ensure_path(
        &mut self,
        task: Task,
        size: InputSize,
        library: &LibraryId,
    ) -> &mut Vec<f64> {
        self.tasks
            .entry(task)
            .or_default()
            .entry(size)
            .or_default()
            .entry(library.clone())
            .or_default()
    }

    /// Samples recorded for a triple, if the path exists.
    pub fn samples(&self, task: Task, size: InputSize, library: &LibraryId) -> Option<&[f64]> {
        self.tasks
            .get(&task)?
            .get(&size)?
            .get(library)
            .map(Vec::as_slice)
    }

    /// Sizes and libraries recorded for a task.
    pub fn task(&self, task: Task) -> Option<&SizeResults> {
        self.tasks.get(&task)
    }

    /// Tasks present, in enumeration order.
    pub fn tasks(&self) -> impl Iterator<Item = Task> + '_ {
        self.tasks.keys().copied()
    }

    /// Every (task, size, library, samples) entry in key order.
    pub fn entries(&self) -> impl Iterator<Item = (Task, InputSize, &LibraryId, &[f64])> + '_ {
        self.tasks.iter().flat_map(|(&task, sizes)| {
            sizes.iter().flat_map(move |(&size, libraries)| {
                libraries
                    .iter()
                    .map(move |(library, samples)| (task, size, library, samples.as_slice()))
            })
        })
    }

    /// Number of (task, size, library) paths.
    pub fn path_count(&self) -> usize {
        self.entries().count()
    }

    /// Total number of samples across all paths.
    pub fn sample_count(&self) -> usize {
        self.entries().map(|(_, _, _, samples)| samples.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Copy of the paths belonging to `cells`, samples included.
    pub fn restricted_to<'a>(&self, cells: impl IntoIterator<Item = &'a MatrixCell>) -> ResultSet {
        let mut restricted = ResultSet::new();
        for cell in cells {
            if let Some(samples) = self.samples(cell.task, cell.size, &cell.library) {
                restricted
                    .ensure_path(cell.task, cell.size, &cell.library)
                    .extend_from_slice(samples);
            }
        }
        restricted
    }

    /// Paths whose sample count is neither zero nor `replicates`.
    pub fn incomplete_paths(&self, replicates: usize) -> Vec<MatrixCell> {
        self.entries()
            .filter(|(_, _, _, samples)| !samples.is_empty() && samples.len() != replicates)
            .map(|(task, size, library, _)| MatrixCell {
                task,
                size,
                library: library.clone(),
            })
            .collect()
    }
}

/// Lifecycle of the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    /// Accepting samples.
    Collecting,
    /// Finalized; no more samples.
    Frozen,
}

/// Owns the result set while a sweep is running.
#[derive(Debug)]
pub struct ResultAggregator {
    results: ResultSet,
    state: AggregatorState,
}

impl ResultAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self {
            results: ResultSet::new(),
            state: AggregatorState::Collecting,
        }
    }

    /// Create an aggregator whose key skeleton already holds every cell.
    pub fn with_skeleton<'a>(cells: impl IntoIterator<Item = &'a MatrixCell>) -> Self {
        let mut aggregator = Self::new();
        for cell in cells {
            aggregator
                .results
                .ensure_path(cell.task, cell.size, &cell.library);
        }
        aggregator
    }

    pub fn state(&self) -> AggregatorState {
        self.state
    }

    /// Append one sample. Never overwrites earlier samples.
    pub fn record(
        &mut self,
        task: Task,
        size: InputSize,
        library: &LibraryId,
        sample: f64,
    ) -> Result<(), ResultSetError> {
        if self.state == AggregatorState::Frozen {
            return Err(ResultSetError::Frozen {
                task,
                size,
                library: library.clone(),
            });
        }
        self.results.ensure_path(task, size, library).push(sample);
        Ok(())
    }

    /// Append every sample of a completed cell in replicate order.
    pub fn record_cell(&mut self, cell: &MatrixCell, samples: &[f64]) -> Result<(), ResultSetError> {
        if self.state == AggregatorState::Frozen {
            return Err(ResultSetError::Frozen {
                task: cell.task,
                size: cell.size,
                library: cell.library.clone(),
            });
        }
        // Path must exist even when every replicate was unsupported.
        self.results.ensure_path(cell.task, cell.size, &cell.library);
        for &sample in samples {
            self.record(cell.task, cell.size, &cell.library, sample)?;
        }
        Ok(())
    }

    /// Read-only view of what has been collected so far.
    pub fn snapshot(&self) -> &ResultSet {
        &self.results
    }

    /// Freeze the aggregator and hand over the completed result set.
    pub fn finalize(&mut self) -> Result<ResultSet, ResultSetError> {
        if self.state == AggregatorState::Frozen {
            return Err(ResultSetError::AlreadyFinalized);
        }
        self.state = AggregatorState::Frozen;
        tracing::debug!(
            paths = self.results.path_count(),
            samples = self.results.sample_count(),
            "Result set finalized"
        );
        Ok(std::mem::take(&mut self.results))
    }
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}
