// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! Replicate count, per-task input sizes, candidate libraries and
//! exclusion rules are read once at startup. Any invalid field results in
//! a ConfigError before a single adapter is launched.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::artifact::{ArtifactLocator, SIZE_PLACEHOLDER};
use crate::error::{BenchError, BenchResult, ConfigError};
use crate::matrix::{ExclusionRules, TaskMatrix};
use crate::types::{InputSize, LibraryId, Task};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "treebench.yaml";

const MAX_REPLICATES: u32 = 1000;

/// Raw sweep settings as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSweepConfig {
    #[serde(default = "default_replicates")]
    replicates: u32,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    #[serde(default = "default_data_dir")]
    data_dir: String,
    #[serde(default = "default_artifact_pattern")]
    artifact_pattern: String,
    #[serde(default = "default_output")]
    output: String,
}

fn default_replicates() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    600 // 10 minutes per invocation
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_artifact_pattern() -> String {
    "tree_n{size}.tre.gz".to_string()
}

fn default_output() -> String {
    "data.bin.gz".to_string()
}

impl Default for RawSweepConfig {
    fn default() -> Self {
        Self {
            replicates: default_replicates(),
            timeout_secs: default_timeout_secs(),
            data_dir: default_data_dir(),
            artifact_pattern: default_artifact_pattern(),
            output: default_output(),
        }
    }
}

/// Raw candidate library entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLibraryConfig {
    id: String,
    #[serde(default)]
    builtin: bool,
    #[serde(default)]
    command: Vec<String>,
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    sweep: RawSweepConfig,
    libraries: Vec<RawLibraryConfig>,
    #[serde(default)]
    sizes: BTreeMap<String, Vec<u32>>,
    #[serde(default)]
    exclusions: BTreeMap<String, BTreeMap<String, u32>>,
}

/// How a library's timing adapter is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterKind {
    /// The treebench binary's own `time` subcommand.
    Builtin,
    /// An external program; artifact, library and task are appended.
    Command { program: String, args: Vec<String> },
}

/// Validated candidate library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    pub id: LibraryId,
    pub adapter: AdapterKind,
}

/// Validated sweep settings.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub replicates: u32,
    /// Bound on a single adapter invocation.
    pub timeout: Duration,
    pub data_dir: PathBuf,
    pub artifact_pattern: String,
    pub output: PathBuf,
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub sweep: SweepConfig,
    /// Enumeration order of candidate libraries.
    pub libraries: Vec<LibraryConfig>,
    pub sizes: BTreeMap<Task, Vec<InputSize>>,
    pub exclusions: ExclusionRules,
}

impl Config {
    /// Library identifiers in enumeration order.
    pub fn library_ids(&self) -> Vec<LibraryId> {
        self.libraries.iter().map(|l| l.id.clone()).collect()
    }

    /// The matrix this configuration describes.
    pub fn matrix(&self) -> TaskMatrix {
        TaskMatrix::build(&self.sizes, &self.library_ids(), &self.exclusions)
    }

    /// Where input artifacts live.
    pub fn artifacts(&self) -> ArtifactLocator {
        ArtifactLocator::new(&self.sweep.data_dir, &self.sweep.artifact_pattern)
    }

    /// Every distinct input size across tasks, ascending.
    pub fn all_sizes(&self) -> Vec<InputSize> {
        self.sizes
            .values()
            .flatten()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Keep only the named tasks. Unknown names are rejected.
    pub fn select_tasks<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), ConfigError> {
        if names.is_empty() {
            return Ok(());
        }
        let wanted = names
            .iter()
            .map(|name| name.as_ref().parse::<Task>())
            .collect::<Result<HashSet<_>, _>>()?;
        self.sizes.retain(|task, _| wanted.contains(task));
        Ok(())
    }

    /// Keep only the named libraries, preserving configured order.
    pub fn select_libraries<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<(), ConfigError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut wanted = HashSet::new();
        for id in ids {
            let id = id.as_ref();
            if !self.libraries.iter().any(|l| l.id.as_str() == id) {
                return Err(ConfigError::UnknownLibrary {
                    id: id.to_string(),
                    context: "library selection".to_string(),
                });
            }
            wanted.insert(id.to_string());
        }
        self.libraries.retain(|l| wanted.contains(l.id.as_str()));
        Ok(())
    }

    /// Override the replicate count.
    pub fn set_replicates(&mut self, replicates: u32) -> Result<(), ConfigError> {
        self.sweep.replicates = ConfigLoader::validate_replicates(replicates)?;
        Ok(())
    }

    /// Override the per-invocation bound.
    pub fn set_timeout_secs(&mut self, secs: u64) -> Result<(), ConfigError> {
        self.sweep.timeout = ConfigLoader::validate_timeout(secs)?;
        Ok(())
    }

    /// Ids of libraries run through the treebench binary itself.
    pub fn builtin_libraries(&self) -> impl Iterator<Item = &LibraryId> + '_ {
        self.libraries
            .iter()
            .filter(|l| l.adapter == AdapterKind::Builtin)
            .map(|l| &l.id)
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> BenchResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BenchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BenchError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> BenchResult<Config> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| BenchError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Ok(Self::validate(raw)?)
    }

    fn validate(raw: RawConfig) -> Result<Config, ConfigError> {
        let sweep = Self::validate_sweep(raw.sweep)?;
        let libraries = Self::validate_libraries(raw.libraries)?;
        let sizes = Self::validate_sizes(raw.sizes)?;
        let exclusions = Self::validate_exclusions(raw.exclusions, &libraries)?;

        Ok(Config {
            sweep,
            libraries,
            sizes,
            exclusions,
        })
    }

    fn validate_replicates(replicates: u32) -> Result<u32, ConfigError> {
        if replicates == 0 || replicates > MAX_REPLICATES {
            return Err(ConfigError::InvalidFieldValue {
                field: "replicates",
                value: replicates.to_string(),
                reason: format!("Must be between 1 and {}", MAX_REPLICATES),
            });
        }
        Ok(replicates)
    }

    fn validate_timeout(secs: u64) -> Result<Duration, ConfigError> {
        if secs == 0 {
            return Err(ConfigError::InvalidFieldValue {
                field: "timeout_secs",
                value: "0".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }
        Ok(Duration::from_secs(secs))
    }

    fn validate_sweep(raw: RawSweepConfig) -> Result<SweepConfig, ConfigError> {
        let replicates = Self::validate_replicates(raw.replicates)?;
        let timeout = Self::validate_timeout(raw.timeout_secs)?;

        if !raw.artifact_pattern.contains(SIZE_PLACEHOLDER) {
            return Err(ConfigError::InvalidFieldValue {
                field: "artifact_pattern",
                value: raw.artifact_pattern,
                reason: format!("Pattern must contain {}", SIZE_PLACEHOLDER),
            });
        }

        if raw.output.is_empty() {
            return Err(ConfigError::InvalidFieldValue {
                field: "output",
                value: raw.output,
                reason: "Output path cannot be empty".to_string(),
            });
        }

        Ok(SweepConfig {
            replicates,
            timeout,
            data_dir: PathBuf::from(raw.data_dir),
            artifact_pattern: raw.artifact_pattern,
            output: PathBuf::from(raw.output),
        })
    }

    fn validate_libraries(raw: Vec<RawLibraryConfig>) -> Result<Vec<LibraryConfig>, ConfigError> {
        if raw.is_empty() {
            return Err(ConfigError::SchemaValidation {
                message: "At least one library must be defined".to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut libraries = Vec::with_capacity(raw.len());

        for raw_lib in raw {
            let id = LibraryId::new(raw_lib.id)?;

            if !seen.insert(id.clone()) {
                return Err(ConfigError::DuplicateLibrary { id: id.to_string() });
            }

            let adapter = match (raw_lib.builtin, raw_lib.command.is_empty()) {
                (true, true) => AdapterKind::Builtin,
                (false, false) => {
                    let mut parts = raw_lib.command.into_iter();
                    // Non-empty, checked above.
                    let program = parts.next().unwrap_or_default();
                    if program.is_empty() {
                        return Err(ConfigError::InvalidFieldValue {
                            field: "command",
                            value: format!("library {}", id),
                            reason: "Program name cannot be empty".to_string(),
                        });
                    }
                    AdapterKind::Command {
                        program,
                        args: parts.collect(),
                    }
                }
                (true, false) => {
                    return Err(ConfigError::InvalidFieldValue {
                        field: "command",
                        value: format!("library {}", id),
                        reason: "A builtin library cannot also define a command".to_string(),
                    })
                }
                (false, true) => {
                    return Err(ConfigError::InvalidFieldValue {
                        field: "command",
                        value: format!("library {}", id),
                        reason: "Either set builtin: true or give a command".to_string(),
                    })
                }
            };

            libraries.push(LibraryConfig { id, adapter });
        }

        Ok(libraries)
    }

    fn validate_sizes(
        raw: BTreeMap<String, Vec<u32>>,
    ) -> Result<BTreeMap<Task, Vec<InputSize>>, ConfigError> {
        let mut sizes = BTreeMap::new();

        for (name, values) in raw {
            let task: Task = name.parse()?;
            let mut seen = HashSet::new();
            let mut task_sizes = Vec::with_capacity(values.len());

            for value in values {
                let size = InputSize::new(value)?;
                if !seen.insert(size) {
                    return Err(ConfigError::DuplicateSize { task, size });
                }
                task_sizes.push(size);
            }

            task_sizes.sort_unstable();
            sizes.insert(task, task_sizes);
        }

        Ok(sizes)
    }

    fn validate_exclusions(
        raw: BTreeMap<String, BTreeMap<String, u32>>,
        libraries: &[LibraryConfig],
    ) -> Result<ExclusionRules, ConfigError> {
        let mut rules = ExclusionRules::new();

        for (name, caps) in raw {
            let task: Task = name.parse()?;
            for (library, max) in caps {
                let id = LibraryId::new(library)?;
                if !libraries.iter().any(|l| l.id == id) {
                    return Err(ConfigError::UnknownLibrary {
                        id: id.to_string(),
                        context: format!("exclusions for task {}", task),
                    });
                }
                let max = InputSize::new(max).map_err(|_| ConfigError::InvalidFieldValue {
                    field: "exclusions",
                    value: format!("{}.{} = 0", task, id),
                    reason: "Maximum input size must be at least 1".to_string(),
                })?;
                rules.insert(task, id, max);
            }
        }

        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_CONFIG: &str = r#"
sweep:
  replicates: 10
  timeout_secs: 120
  data_dir: fixtures
  artifact_pattern: "tree_n{size}.tre.gz"
  output: results.bin.gz

libraries:
  - id: arena
    builtin: true
  - id: dendropy
    command: [python3, scripts/time.py]
  - id: ete3
    command: [python3, scripts/time.py]

sizes:
  height: [10000, 100, 1000]
  distance: [100, 1000]

exclusions:
  height:
    ete3: 1000
"#;

    fn lib(id: &str) -> LibraryId {
        LibraryId::new(id).unwrap()
    }

    fn size(n: u32) -> InputSize {
        InputSize::new(n).unwrap()
    }

    fn assert_config_error(yaml: &str) {
        match ConfigLoader::load_string(yaml) {
            Err(BenchError::Config(_)) => {}
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = ConfigLoader::load_string(VALID_CONFIG).unwrap();
        assert_eq!(config.sweep.replicates, 10);
        assert_eq!(config.sweep.timeout, Duration::from_secs(120));
        assert_eq!(config.library_ids(), vec![lib("arena"), lib("dendropy"), lib("ete3")]);
        assert_eq!(config.libraries[0].adapter, AdapterKind::Builtin);
        assert_eq!(
            config.libraries[1].adapter,
            AdapterKind::Command {
                program: "python3".to_string(),
                args: vec!["scripts/time.py".to_string()],
            }
        );
        assert_eq!(
            config.sizes[&Task::Height],
            vec![size(100), size(1000), size(10000)]
        );
        assert_eq!(config.exclusions.max_size(Task::Height, &lib("ete3")), Some(size(1000)));
        assert_eq!(config.builtin_libraries().collect::<Vec<_>>(), vec![&lib("arena")]);
    }

    #[test]
    fn test_matrix_from_config() {
        let config = ConfigLoader::load_string(VALID_CONFIG).unwrap();
        let matrix = config.matrix();
        // height: 3 sizes x 3 libraries - 1 excluded; distance: 2 x 3
        assert_eq!(matrix.len(), 8 + 6);
        assert!(!matrix
            .iter()
            .any(|c| c.library == lib("ete3") && c.task == Task::Height && c.size == size(10000)));
    }

    #[test]
    fn test_defaults_applied() {
        let yaml = r#"
libraries:
  - id: arena
    builtin: true
"#;
        let config = ConfigLoader::load_string(yaml).unwrap();
        assert_eq!(config.sweep.replicates, 10);
        assert_eq!(config.sweep.timeout, Duration::from_secs(600));
        assert_eq!(config.sweep.output, PathBuf::from("data.bin.gz"));
        assert!(config.sizes.is_empty());
        assert!(config.matrix().is_empty());
    }

    #[test]
    fn test_no_libraries() {
        assert_config_error("libraries: []\n");
    }

    #[test]
    fn test_zero_replicates() {
        assert_config_error(
            r#"
sweep:
  replicates: 0
libraries:
  - id: arena
    builtin: true
"#,
        );
    }

    #[test]
    fn test_pattern_without_placeholder() {
        assert_config_error(
            r#"
sweep:
  artifact_pattern: tree.tre.gz
libraries:
  - id: arena
    builtin: true
"#,
        );
    }

    #[test]
    fn test_unknown_task() {
        assert_config_error(
            r#"
libraries:
  - id: arena
    builtin: true
sizes:
  ladderize: [100]
"#,
        );
    }

    #[test]
    fn test_duplicate_library() {
        assert_config_error(
            r#"
libraries:
  - id: arena
    builtin: true
  - id: arena
    command: [python3]
"#,
        );
    }

    #[test]
    fn test_library_needs_exactly_one_adapter() {
        assert_config_error(
            r#"
libraries:
  - id: arena
"#,
        );
        assert_config_error(
            r#"
libraries:
  - id: arena
    builtin: true
    command: [python3]
"#,
        );
    }

    #[test]
    fn test_duplicate_and_zero_sizes() {
        assert_config_error(
            r#"
libraries:
  - id: arena
    builtin: true
sizes:
  height: [100, 100]
"#,
        );
        assert_config_error(
            r#"
libraries:
  - id: arena
    builtin: true
sizes:
  height: [0]
"#,
        );
    }

    #[test]
    fn test_exclusion_for_unknown_library() {
        assert_config_error(
            r#"
libraries:
  - id: arena
    builtin: true
exclusions:
  height:
    ete3: 1000
"#,
        );
    }

    #[test]
    fn test_unknown_field_is_parse_error() {
        let yaml = r#"
libraries:
  - id: arena
    builtin: true
replicas: 3
"#;
        assert!(matches!(
            ConfigLoader::load_string(yaml),
            Err(BenchError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_select_tasks_and_libraries() {
        let mut config = ConfigLoader::load_string(VALID_CONFIG).unwrap();
        config.select_tasks(&["distance"]).unwrap();
        config.select_libraries(&["ete3", "arena"]).unwrap();

        assert_eq!(config.sizes.keys().copied().collect::<Vec<_>>(), vec![Task::Distance]);
        // Configured order wins over selection order.
        assert_eq!(config.library_ids(), vec![lib("arena"), lib("ete3")]);

        assert!(config.select_tasks(&["mrca"]).is_err());
        assert!(config.select_libraries(&["dendropy"]).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = ConfigLoader::load_string(VALID_CONFIG).unwrap();
        config.set_replicates(3).unwrap();
        config.set_timeout_secs(5).unwrap();
        assert_eq!(config.sweep.replicates, 3);
        assert_eq!(config.sweep.timeout, Duration::from_secs(5));

        assert!(config.set_replicates(0).is_err());
        assert!(config.set_timeout_secs(0).is_err());
        assert_eq!(config.sweep.replicates, 3);
    }

    #[test]
    fn test_all_sizes() {
        let config = ConfigLoader::load_string(VALID_CONFIG).unwrap();
        assert_eq!(config.all_sizes(), vec![size(100), size(1000), size(10000)]);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ConfigLoader::load_file("/nonexistent/treebench.yaml"),
            Err(BenchError::ConfigNotFound { .. })
        ));
    }
}
