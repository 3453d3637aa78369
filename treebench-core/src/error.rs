// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for treebench.
//!
//! Explicit enum error types only. An adapter reporting "unsupported" is
//! not an error and never shows up here; see [`crate::adapter::Measurement`].

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::matrix::MatrixCell;
use crate::results::ResultSet;
use crate::types::{InputSize, LibraryId, Task};

/// Top-level error type for treebench.
#[derive(Debug, Error)]
pub enum BenchError {
    // =========================================================================
    // Configuration Errors - reported before any measurement starts
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Sweep Errors - fatal, no retry
    // =========================================================================
    #[error("Sweep aborted: {0}")]
    Sweep(#[from] Box<SweepFailure>),

    #[error("Result set error: {0}")]
    ResultSet(#[from] ResultSetError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Hard validation errors. The sweep refuses to start on any of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unknown task: {name} (known: height, average_length, distance, treeness)")]
    UnknownTask { name: String },

    #[error("Unknown library '{id}' referenced in {context}")]
    UnknownLibrary { id: String, context: String },

    #[error("Duplicate library ID: {id}")]
    DuplicateLibrary { id: String },

    #[error("Duplicate input size {size} for task {task}")]
    DuplicateSize { task: Task, size: InputSize },

    #[error("Input artifact for {size} leaves not found: {path}")]
    MissingArtifact { size: InputSize, path: PathBuf },

    #[error("Schema validation failed: {message}")]
    SchemaValidation { message: String },
}

/// Failures at the adapter invocation boundary. All of them are fatal.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("Failed to spawn adapter '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Adapter exited with {status}; stderr: {stderr}")]
    Crashed { status: String, stderr: String },

    #[error("Adapter produced malformed output: {output:?}")]
    MalformedOutput { output: String },

    #[error("Adapter did not finish within {limit:?} and was killed")]
    Timeout { limit: Duration },

    #[error(
        "Adapter reported {current} after reporting {first} for an earlier replicate; \
         a library must either support a task or not"
    )]
    InconsistentSupport {
        first: &'static str,
        current: &'static str,
    },

    #[error("No timing adapter registered for library {library}")]
    NoAdapter { library: LibraryId },

    #[error("IO error talking to adapter: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Misuse of the result aggregator's lifecycle.
#[derive(Debug, Error)]
pub enum ResultSetError {
    #[error("Cannot record a sample for {task}/{size}/{library}: result set is frozen")]
    Frozen {
        task: Task,
        size: InputSize,
        library: LibraryId,
    },

    #[error("Result set has already been finalized")]
    AlreadyFinalized,
}

/// Errors reading or writing a persisted result archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Unsupported archive format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// A fatal adapter failure together with where the sweep stood.
#[derive(Debug, Error)]
#[error(
    "{cell} replicate {replicate} failed (last completed: {}): {source}",
    .last_completed.as_ref().map(|c| c.to_string()).unwrap_or_else(|| "none".to_string())
)]
pub struct SweepFailure {
    /// The triple whose invocation failed.
    pub cell: MatrixCell,
    /// One-based replicate number of the failing invocation.
    pub replicate: u32,
    /// Last triple whose replicates all completed.
    pub last_completed: Option<MatrixCell>,
    /// Underlying invocation failure.
    #[source]
    pub source: InvocationError,
    /// Samples of every completed triple. Not a valid result set on its own.
    pub partial: ResultSet,
}

/// Result type alias using BenchError.
pub type BenchResult<T> = Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(library: &str) -> MatrixCell {
        MatrixCell {
            task: Task::Distance,
            size: InputSize::new(10000).unwrap(),
            library: LibraryId::new(library).unwrap(),
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnknownLibrary {
            id: "ete4".to_string(),
            context: "exclusions for task height".to_string(),
        };
        assert!(err.to_string().contains("ete4"));
        assert!(err.to_string().contains("height"));
    }

    #[test]
    fn test_error_chain() {
        let err: BenchError = ConfigError::SchemaValidation {
            message: "no libraries".to_string(),
        }
        .into();
        assert!(matches!(err, BenchError::Config(_)));
    }

    #[test]
    fn test_sweep_failure_names_both_cells() {
        let failure = SweepFailure {
            cell: cell("libD"),
            replicate: 4,
            last_completed: Some(cell("libC")),
            source: InvocationError::Crashed {
                status: "exit status: 1".to_string(),
                stderr: "Traceback".to_string(),
            },
            partial: ResultSet::new(),
        };
        let message = failure.to_string();
        assert!(message.contains("libD"));
        assert!(message.contains("libC"));
        assert!(message.contains("replicate 4"));
        assert!(message.contains("Traceback"));
    }

    #[test]
    fn test_sweep_failure_without_completed_cell() {
        let failure = SweepFailure {
            cell: cell("libA"),
            replicate: 1,
            last_completed: None,
            source: InvocationError::Timeout {
                limit: Duration::from_secs(5),
            },
            partial: ResultSet::new(),
        };
        assert!(failure.to_string().contains("last completed: none"));
    }
}
