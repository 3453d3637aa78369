// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Errors raised while reading or computing on native trees.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Newick parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("Tree description is empty")]
    Empty,

    #[error("Tree has no leaves")]
    NoLeaves,

    #[error("Failed to read tree from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown native library '{name}' (known: arena, boxed)")]
    UnknownLibrary { name: String },
}

impl TreeError {
    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        TreeError::Parse {
            offset,
            message: message.into(),
        }
    }
}

pub type TreeResult<T> = Result<T, TreeError>;
