// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Input artifact lookup.
//!
//! Each input size maps to exactly one pre-generated tree file, named by
//! substituting the size into the configured pattern.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::matrix::TaskMatrix;
use crate::types::InputSize;

/// Placeholder replaced by the leaf count in artifact patterns.
pub const SIZE_PLACEHOLDER: &str = "{size}";

/// Resolves input sizes to artifact paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocator {
    data_dir: PathBuf,
    pattern: String,
}

impl ArtifactLocator {
    pub fn new(data_dir: impl AsRef<Path>, pattern: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            pattern: pattern.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the artifact holding a tree with `size` leaves.
    pub fn path_for(&self, size: InputSize) -> PathBuf {
        self.data_dir
            .join(self.pattern.replace(SIZE_PLACEHOLDER, &size.to_string()))
    }

    /// Check that every size the matrix needs has an artifact on disk.
    pub fn verify(&self, matrix: &TaskMatrix) -> Result<(), ConfigError> {
        for size in matrix.input_sizes() {
            let path = self.path_for(size);
            if !path.is_file() {
                return Err(ConfigError::MissingArtifact { size, path });
            }
        }
        Ok(())
    }
}
