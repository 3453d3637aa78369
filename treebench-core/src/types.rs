// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated benchmark identifiers.
//!
//! Tasks, candidate libraries and input sizes are validated once when the
//! configuration is loaded; everything downstream can trust them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum length of a library identifier.
const MAX_LIBRARY_ID_LEN: usize = 64;

/// A tree computation being benchmarked.
///
/// Declaration order is the enumeration order of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// Maximum root-to-leaf path length.
    Height,
    /// Mean branch length over all edges.
    AverageLength,
    /// Path length between two leaves.
    Distance,
    /// Internal branch length divided by total branch length.
    Treeness,
}

impl Task {
    /// Every known task, in enumeration order.
    pub const ALL: [Task; 4] = [
        Task::Height,
        Task::AverageLength,
        Task::Distance,
        Task::Treeness,
    ];

    /// Identifier used on the command line and in configuration files.
    pub const fn name(&self) -> &'static str {
        match self {
            Task::Height => "height",
            Task::AverageLength => "average_length",
            Task::Distance => "distance",
            Task::Treeness => "treeness",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Task {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Task::ALL
            .into_iter()
            .find(|task| task.name() == s)
            .ok_or_else(|| ConfigError::UnknownTask {
                name: s.to_string(),
            })
    }
}

/// Validated candidate library identifier.
/// Must be non-empty, alphanumeric with hyphens/underscores/dots, max 64 chars.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LibraryId(String);

impl LibraryId {
    /// Create a new LibraryId with validation.
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigError> {
        let id = id.into();

        if id.is_empty() {
            return Err(ConfigError::InvalidFieldValue {
                field: "library_id",
                value: id,
                reason: "Library ID cannot be empty".to_string(),
            });
        }

        if id.len() > MAX_LIBRARY_ID_LEN {
            return Err(ConfigError::InvalidFieldValue {
                field: "library_id",
                value: id.clone(),
                reason: format!(
                    "Library ID too long: {} chars (max {})",
                    id.len(),
                    MAX_LIBRARY_ID_LEN
                ),
            });
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(ConfigError::InvalidFieldValue {
                field: "library_id",
                value: id,
                reason: "Library ID must contain only ASCII alphanumerics, '-', '_' and '.'"
                    .to_string(),
            });
        }

        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LibraryId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LibraryId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LibraryId> for String {
    fn from(id: LibraryId) -> Self {
        id.0
    }
}

/// Number of leaves in a test tree. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct InputSize(u32);

impl InputSize {
    /// Create a new InputSize, rejecting zero.
    pub fn new(leaves: u32) -> Result<Self, ConfigError> {
        if leaves == 0 {
            return Err(ConfigError::InvalidFieldValue {
                field: "input_size",
                value: "0".to_string(),
                reason: "Input size must be at least one leaf".to_string(),
            });
        }
        Ok(Self(leaves))
    }

    /// Number of leaves.
    pub fn leaves(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for InputSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for InputSize {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<InputSize> for u32 {
    fn from(size: InputSize) -> Self {
        size.0
    }
}
