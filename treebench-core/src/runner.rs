// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Measurement runner.
//!
//! Walks the task matrix strictly sequentially, invoking the timing adapter
//! once per replicate and never overlapping two invocations. Samples of a
//! cell reach the aggregator only after all of its replicates succeeded, so
//! every recorded path holds either zero or exactly `replicates` samples.
//! The first adapter failure aborts the sweep without finalizing.

use crate::adapter::{Invocation, Measurement, TimingAdapter};
use crate::artifact::ArtifactLocator;
use crate::error::{BenchError, BenchResult, InvocationError, SweepFailure};
use crate::matrix::{MatrixCell, TaskMatrix};
use crate::results::{ResultAggregator, ResultSet};
use crate::types::{InputSize, Task};

/// Hooks for progress reporting. Observers see the data but cannot change it.
pub trait SweepObserver {
    fn task_started(&mut self, _task: Task) {}
    fn size_started(&mut self, _task: Task, _size: InputSize) {}
    fn cell_started(&mut self, _cell: &MatrixCell) {}
    fn replicate_finished(&mut self, _cell: &MatrixCell, _replicate: u32, _measurement: &Measurement) {}
    fn cell_finished(&mut self, _cell: &MatrixCell, _samples: &[f64]) {}
    fn sweep_finished(&mut self, _results: &ResultSet) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl SweepObserver for SilentObserver {}

/// Drives a timing adapter over a task matrix.
#[derive(Debug)]
pub struct MeasurementRunner<A> {
    adapter: A,
    artifacts: ArtifactLocator,
    replicates: u32,
}

impl<A: TimingAdapter> MeasurementRunner<A> {
    pub fn new(adapter: A, artifacts: ArtifactLocator, replicates: u32) -> Self {
        Self {
            adapter,
            artifacts,
            replicates,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn replicates(&self) -> u32 {
        self.replicates
    }

    /// Run every cell and return the finalized result set.
    ///
    /// Missing artifacts are reported before the first invocation.
    pub async fn run<O: SweepObserver>(
        &self,
        matrix: &TaskMatrix,
        observer: &mut O,
    ) -> BenchResult<ResultSet> {
        self.artifacts.verify(matrix)?;

        tracing::info!(
            cells = matrix.len(),
            replicates = self.replicates,
            invocations = matrix.len() as u64 * u64::from(self.replicates),
            "Starting sweep"
        );

        let mut aggregator = ResultAggregator::with_skeleton(matrix);
        let mut current_task = None;
        let mut current_size = None;

        for (index, cell) in matrix.iter().enumerate() {
            if current_task != Some(cell.task) {
                tracing::info!(task = %cell.task, "Running task");
                observer.task_started(cell.task);
                current_task = Some(cell.task);
                current_size = None;
            }
            if current_size != Some(cell.size) {
                observer.size_started(cell.task, cell.size);
                current_size = Some(cell.size);
            }

            observer.cell_started(cell);
            let samples = match self.measure_cell(cell, observer).await {
                Ok(samples) => samples,
                Err((replicate, source)) => {
                    let completed = &matrix.cells()[..index];
                    tracing::error!(
                        cell = %cell,
                        replicate,
                        error = %source,
                        "Adapter invocation failed, aborting sweep"
                    );
                    return Err(BenchError::Sweep(Box::new(SweepFailure {
                        cell: cell.clone(),
                        replicate,
                        last_completed: completed.last().cloned(),
                        source,
                        partial: aggregator.snapshot().restricted_to(completed),
                    })));
                }
            };

            aggregator.record_cell(cell, &samples)?;
            tracing::debug!(cell = %cell, samples = samples.len(), "Cell complete");
            observer.cell_finished(cell, &samples);
        }

        let results = aggregator.finalize()?;
        tracing::info!(
            paths = results.path_count(),
            samples = results.sample_count(),
            "Sweep complete"
        );
        observer.sweep_finished(&results);
        Ok(results)
    }

    /// All replicates of one cell, in replicate order.
    async fn measure_cell<O: SweepObserver>(
        &self,
        cell: &MatrixCell,
        observer: &mut O,
    ) -> Result<Vec<f64>, (u32, InvocationError)> {
        let artifact = self.artifacts.path_for(cell.size);
        let mut samples = Vec::with_capacity(self.replicates as usize);
        let mut first: Option<Measurement> = None;

        for replicate in 1..=self.replicates {
            let invocation = Invocation {
                cell,
                replicate,
                artifact: &artifact,
            };
            let measurement = self
                .adapter
                .measure(&invocation)
                .await
                .map_err(|e| (replicate, e))?;

            match first {
                None => first = Some(measurement),
                Some(earlier) if earlier.is_supported() != measurement.is_supported() => {
                    return Err((
                        replicate,
                        InvocationError::InconsistentSupport {
                            first: support_label(&earlier),
                            current: support_label(&measurement),
                        },
                    ));
                }
                Some(_) => {}
            }

            observer.replicate_finished(cell, replicate, &measurement);
            if let Measurement::Elapsed(seconds) = measurement {
                samples.push(seconds);
            }
        }

        Ok(samples)
    }
}

fn support_label(measurement: &Measurement) -> &'static str {
    match measurement {
        Measurement::Elapsed(_) => "a timing",
        Measurement::Unsupported => "unsupported",
    }
}
