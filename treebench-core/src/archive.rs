// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Persisted result archive.
//!
//! A gzip-compressed bincode blob holding the result set plus enough
//! metadata to tell a finished sweep from an explicitly saved partial one.
//! The format version is the first encoded field and is checked before
//! the rest of the archive is decoded.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sysinfo::System;

use crate::error::ArchiveError;
use crate::results::ResultSet;

/// Current archive format version.
pub const ARCHIVE_FORMAT_VERSION: u32 = 1;

/// Host information captured when the sweep ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub kernel_version: Option<String>,
    pub cpu_model: String,
    pub cpu_cores: usize,
    /// Total memory in bytes
    pub memory_bytes: u64,
    pub hostname: String,
}

impl SystemInfo {
    /// Collect current system information.
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        Self {
            os: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
            kernel_version: System::kernel_version(),
            cpu_model: sys
                .cpus()
                .first()
                .map(|cpu| cpu.brand().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            cpu_cores: sys.cpus().len(),
            memory_bytes: sys.total_memory(),
            hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

/// Everything written to the output blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultArchive {
    pub format_version: u32,
    /// False only for a partial result set saved after a failed sweep.
    pub complete: bool,
    pub replicates: u32,
    pub created_at: DateTime<Utc>,
    pub system: SystemInfo,
    pub results: ResultSet,
}

impl ResultArchive {
    /// Archive for a sweep that processed every cell.
    pub fn complete(results: ResultSet, replicates: u32) -> Self {
        Self::with_flag(results, replicates, true)
    }

    /// Archive for the completed cells of an aborted sweep.
    pub fn incomplete(results: ResultSet, replicates: u32) -> Self {
        Self::with_flag(results, replicates, false)
    }

    fn with_flag(results: ResultSet, replicates: u32, complete: bool) -> Self {
        Self {
            format_version: ARCHIVE_FORMAT_VERSION,
            complete,
            replicates,
            created_at: Utc::now(),
            system: SystemInfo::collect(),
            results,
        }
    }

    /// Encode and compress.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ArchiveError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        bincode::serialize_into(&mut encoder, self)?;
        encoder.finish().map_err(|source| ArchiveError::Io {
            path: PathBuf::from("<memory>"),
            source,
        })
    }

    /// Decompress and decode, rejecting unknown format versions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArchiveError> {
        Self::decode(GzDecoder::new(bytes), Path::new("<memory>"))
    }

    /// Write atomically: a temporary sibling is written, then renamed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArchiveError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }

        let tmp = temp_sibling(path);
        let written = self
            .write_to(&tmp)
            .and_then(|()| fs::rename(&tmp, path).map_err(|source| io_error(path, source)));
        if let Err(err) = written {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                tracing::debug!(path = %tmp.display(), error = %cleanup, "Could not remove temporary archive");
            }
            return Err(err);
        }
        tracing::info!(
            path = %path.display(),
            complete = self.complete,
            paths = self.results.path_count(),
            "Result archive written"
        );
        Ok(())
    }

    fn write_to(&self, tmp: &Path) -> Result<(), ArchiveError> {
        let file = File::create(tmp).map_err(|source| io_error(tmp, source))?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        bincode::serialize_into(&mut encoder, self)?;
        encoder
            .finish()
            .and_then(|mut writer| writer.flush())
            .map_err(|source| io_error(tmp, source))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| io_error(path, source))?;
        Self::decode(GzDecoder::new(BufReader::new(file)), path)
    }

    fn decode(mut reader: impl Read, path: &Path) -> Result<Self, ArchiveError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|source| io_error(path, source))?;

        let found: u32 = bincode::deserialize(&bytes)?;
        if found != ARCHIVE_FORMAT_VERSION {
            return Err(ArchiveError::UnsupportedVersion {
                found,
                expected: ARCHIVE_FORMAT_VERSION,
            });
        }
        Ok(bincode::deserialize(&bytes)?)
    }
}

/// `<output>.partial`, where an aborted sweep's data goes.
pub fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".tmp{}", std::process::id()));
    PathBuf::from(name)
}

fn io_error(path: &Path, source: std::io::Error) -> ArchiveError {
    ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}
