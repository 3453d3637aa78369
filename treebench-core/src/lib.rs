//! Treebench Core Library
//!
//! Benchmark orchestration for phylogenetic tree libraries. Provides the
//! task matrix with per-library size exclusions, the process-isolated
//! measurement runner, result aggregation and the persisted archive.

pub mod adapter;
pub mod archive;
pub mod artifact;
pub mod config;
pub mod error;
pub mod matrix;
pub mod results;
pub mod runner;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use adapter::{
    AdapterCommand, InterruptHandle, Invocation, Measurement, ProcessAdapter, TimingAdapter,
};
pub use archive::{ResultArchive, SystemInfo};
pub use artifact::ArtifactLocator;
pub use config::{AdapterKind, Config, ConfigLoader, LibraryConfig, SweepConfig};
pub use error::{
    ArchiveError, BenchError, BenchResult, ConfigError, InvocationError, ResultSetError,
    SweepFailure,
};
pub use matrix::{ExclusionRules, MatrixCell, TaskMatrix};
pub use results::{ResultAggregator, ResultSet};
pub use runner::{MeasurementRunner, SilentObserver, SweepObserver};
pub use stats::SampleSummary;
pub use types::{InputSize, LibraryId, Task};
