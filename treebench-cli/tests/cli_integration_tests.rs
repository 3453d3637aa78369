// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI integration tests driving the real binary.
//!
//! External adapters are `sh -c` scripts, which receive the artifact,
//! library and task as `$1`, `$2` and `$3`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use assert_cmd::cargo::CommandCargoExt;
use assert_cmd::Command;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use predicates::prelude::*;
use tempfile::TempDir;
use treebench_core::{InputSize, LibraryId, ResultArchive, Task};

fn treebench(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("treebench").expect("Failed to find treebench binary");
    cmd.current_dir(dir);
    cmd
}

/// A workspace with a config file and plain-text artifacts for `sizes`.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(config: &str, sizes: &[u32]) -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("data")).unwrap();
        for n in sizes {
            fs::write(
                dir.path().join("data").join(format!("tree_n{n}.tre")),
                "((L1:1,L2:2):1,L3:3);\n",
            )
            .unwrap();
        }
        fs::write(dir.path().join("treebench.yaml"), config).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> Command {
        treebench(self.path())
    }

    fn output(&self) -> PathBuf {
        self.path().join("data.bin.gz")
    }

    fn partial(&self) -> PathBuf {
        self.path().join("data.bin.gz.partial")
    }
}

fn lib(id: &str) -> LibraryId {
    LibraryId::new(id).unwrap()
}

fn size(n: u32) -> InputSize {
    InputSize::new(n).unwrap()
}

const SCRIPTED: &str = r#"
sweep:
  replicates: 10
  timeout_secs: 30
  artifact_pattern: "tree_n{size}.tre"
libraries:
  - id: libA
    command: [sh, -c, 'echo 0.005', adapter]
  - id: libB
    command: [sh, -c, 'echo 0.25', adapter]
  - id: libC
    command: [sh, -c, 'if [ "$3" = treeness ]; then echo NA; else echo 0.5; fi', adapter]
sizes:
  height: [100, 1000, 10000]
  treeness: [100]
exclusions:
  height:
    libB: 1000
"#;

// ===== Help =====

#[test]
fn test_help_output() {
    treebench(Path::new("."))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("summary"));
}

#[test]
fn test_no_subcommand_fails() {
    treebench(Path::new(".")).assert().failure();
}

// ===== Run =====

#[test]
fn test_run_records_every_cell() {
    let ws = Workspace::new(SCRIPTED, &[100, 1000, 10000]);

    ws.cmd()
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Running task: height ==="))
        .stdout(predicate::str::contains("- X = 100 leaves. libA.........."))
        .stdout(predicate::str::contains("Results written to"));

    let archive = ResultArchive::load(ws.output()).unwrap();
    assert!(archive.complete);
    assert_eq!(archive.replicates, 10);

    let results = &archive.results;
    assert_eq!(
        results.samples(Task::Height, size(100), &lib("libA")),
        Some(&[0.005; 10][..])
    );
    // Excluded above 1000 leaves.
    assert!(results
        .samples(Task::Height, size(10000), &lib("libB"))
        .is_none());
    assert_eq!(
        results
            .samples(Task::Height, size(10000), &lib("libC"))
            .map(<[f64]>::len),
        Some(10)
    );
    // Unsupported everywhere: present but empty.
    assert_eq!(
        results
            .samples(Task::Treeness, size(100), &lib("libC"))
            .map(<[f64]>::len),
        Some(0)
    );
    assert!(results.incomplete_paths(10).is_empty());
}

#[test]
fn test_run_with_overrides() {
    let ws = Workspace::new(SCRIPTED, &[100, 1000, 10000]);
    let out = ws.path().join("subset.bin.gz");

    ws.cmd()
        .args(["run", "--task", "treeness", "--library", "libA", "-r", "3", "-o"])
        .arg(&out)
        .assert()
        .success();

    let archive = ResultArchive::load(&out).unwrap();
    assert_eq!(archive.replicates, 3);
    assert_eq!(archive.results.path_count(), 1);
    assert_eq!(archive.results.sample_count(), 3);
    assert!(!ws.output().exists());
}

#[test]
fn test_crash_aborts_without_archive() {
    let config = r#"
sweep:
  replicates: 4
  artifact_pattern: "tree_n{size}.tre"
libraries:
  - id: libC
    command: [sh, -c, 'echo 0.1', adapter]
  - id: libD
    command: [sh, -c, 'if [ "$3" = distance ]; then echo "segfault in libD" >&2; exit 3; fi; echo 0.1', adapter]
sizes:
  height: [100]
  distance: [100, 10000]
"#;
    let ws = Workspace::new(config, &[100, 10000]);

    ws.cmd()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("task=distance size=100 library=libD"))
        .stderr(predicate::str::contains("replicate 1"))
        .stderr(predicate::str::contains(
            "last completed: task=distance size=100 library=libC",
        ))
        .stderr(predicate::str::contains("segfault in libD"));

    assert!(!ws.output().exists());
    assert!(!ws.partial().exists());
}

#[test]
fn test_keep_partial_marks_archive_incomplete() {
    let config = r#"
sweep:
  replicates: 2
  artifact_pattern: "tree_n{size}.tre"
libraries:
  - id: libC
    command: [sh, -c, 'echo 0.1', adapter]
  - id: libD
    command: [sh, -c, 'exit 1', adapter]
sizes:
  height: [100]
"#;
    let ws = Workspace::new(config, &[100]);

    ws.cmd()
        .args(["run", "--keep-partial"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Partial results (incomplete)"));

    assert!(!ws.output().exists());
    let partial = ResultArchive::load(ws.partial()).unwrap();
    assert!(!partial.complete);
    assert_eq!(
        partial.results.samples(Task::Height, size(100), &lib("libC")),
        Some(&[0.1, 0.1][..])
    );
    assert!(partial
        .results
        .samples(Task::Height, size(100), &lib("libD"))
        .is_none());
}

#[test]
fn test_malformed_output_is_fatal() {
    let config = r#"
sweep:
  artifact_pattern: "tree_n{size}.tre"
libraries:
  - id: libA
    command: [sh, -c, 'echo "took 3 seconds"', adapter]
sizes:
  height: [100]
"#;
    let ws = Workspace::new(config, &[100]);

    ws.cmd()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed output"));
}

#[test]
fn test_timeout_kills_adapter() {
    let config = r#"
sweep:
  replicates: 1
  artifact_pattern: "tree_n{size}.tre"
libraries:
  - id: slow
    command: [sh, -c, 'sleep 30; echo 1', adapter]
sizes:
  height: [100]
"#;
    let ws = Workspace::new(config, &[100]);

    ws.cmd()
        .args(["run", "--timeout", "1"])
        .timeout(Duration::from_secs(20))
        .assert()
        .failure()
        .stderr(predicate::str::contains("did not finish within"))
        .stderr(predicate::str::contains("library=slow"));
}

const SLOW_ADAPTER: &str = r#"
sweep:
  replicates: 1
  timeout_secs: 120
  artifact_pattern: "tree_n{size}.tre"
libraries:
  - id: slow
    command: [sh, -c, 'echo $$ > adapter.pid; sleep 47 & echo $! > sleep.pid; wait; echo 0.1', adapter]
sizes:
  height: [100]
"#;

/// Wait for `file` to hold a pid written by the adapter script.
fn wait_for_pid(file: &Path) -> i32 {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(pid) = fs::read_to_string(file)
            .ok()
            .and_then(|text| text.trim().parse().ok())
        {
            return pid;
        }
        assert!(Instant::now() < deadline, "adapter never wrote {}", file.display());
        thread::sleep(Duration::from_millis(20));
    }
}

/// Running and not a zombie.
fn is_alive(pid: i32) -> bool {
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => !stat
            .rsplit(')')
            .next()
            .is_some_and(|rest| rest.trim_start().starts_with('Z')),
        Err(_) => false,
    }
}

#[test]
fn test_interrupt_kills_running_adapter() {
    let ws = Workspace::new(SLOW_ADAPTER, &[100]);
    let mut run = StdCommand::cargo_bin("treebench")
        .expect("Failed to find treebench binary")
        .arg("run")
        .current_dir(ws.path())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let adapter = wait_for_pid(&ws.path().join("adapter.pid"));
    let sleeper = wait_for_pid(&ws.path().join("sleep.pid"));
    kill(Pid::from_raw(run.id() as i32), Signal::SIGINT).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = run.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            let _ = run.kill();
            panic!("treebench did not exit after SIGINT");
        }
        thread::sleep(Duration::from_millis(20));
    };
    assert!(!status.success());
    assert!(!ws.output().exists());

    let deadline = Instant::now() + Duration::from_secs(5);
    while (is_alive(adapter) || is_alive(sleeper)) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert!(!is_alive(adapter), "adapter {adapter} survived the interrupt");
    assert!(!is_alive(sleeper), "adapter child {sleeper} survived the interrupt");
}

#[test]
fn test_flooding_adapter_is_malformed() {
    let ws = Workspace::new(
        &SCRIPTED.replace("'echo 0.005'", "'yes 0.005'"),
        &[100, 1000, 10000],
    );

    ws.cmd()
        .args(["run", "--library", "libA"])
        .timeout(Duration::from_secs(20))
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed output"));
    assert!(!ws.output().exists());
}

#[test]
fn test_missing_artifact_fails_before_measuring() {
    let marker = "invoked";
    let config = format!(
        r#"
sweep:
  artifact_pattern: "tree_n{{size}}.tre"
libraries:
  - id: libA
    command: [sh, -c, 'touch {marker}; echo 0.1', adapter]
sizes:
  height: [100, 1000]
"#
    );
    let ws = Workspace::new(&config, &[100]);

    ws.cmd()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("1000 leaves not found"));

    assert!(!ws.path().join(marker).exists());
}

#[test]
fn test_unknown_task_selection_fails() {
    let ws = Workspace::new(SCRIPTED, &[100, 1000, 10000]);
    ws.cmd()
        .args(["run", "--task", "mrca"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown task"));
}

// ===== Built-in libraries =====

#[test]
fn test_generate_then_run_builtins() {
    let config = r#"
sweep:
  replicates: 2
libraries:
  - id: arena
    builtin: true
  - id: boxed
    builtin: true
sizes:
  height: [20, 50]
  distance: [20]
"#;
    let ws = Workspace::new(config, &[]);

    ws.cmd()
        .args(["generate", "--seed", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("50 leaves"));
    assert!(ws.path().join("data/tree_n20.tre.gz").is_file());
    assert!(ws.path().join("data/tree_n50.tre.gz").is_file());

    ws.cmd().arg("run").assert().success();

    let archive = ResultArchive::load(ws.output()).unwrap();
    let results = &archive.results;
    assert_eq!(
        results
            .samples(Task::Height, size(50), &lib("boxed"))
            .map(<[f64]>::len),
        Some(2)
    );
    assert_eq!(
        results
            .samples(Task::Distance, size(20), &lib("arena"))
            .map(<[f64]>::len),
        Some(2)
    );
    assert_eq!(
        results
            .samples(Task::Distance, size(20), &lib("boxed"))
            .map(<[f64]>::len),
        Some(0)
    );

    ws.cmd()
        .arg("summary")
        .arg(ws.output())
        .args(["--task", "distance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("complete"))
        .stdout(predicate::str::contains("=== distance ==="))
        .stdout(predicate::str::contains("NA"))
        .stdout(predicate::str::contains("=== height ===").not());
}

#[test]
fn test_time_prints_single_value() {
    let ws = Workspace::new(SCRIPTED, &[100]);
    let tree = ws.path().join("data/tree_n100.tre");

    let output = ws
        .cmd()
        .arg("time")
        .arg(&tree)
        .args(["arena", "distance", "--seed", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let seconds: f64 = stdout.trim().parse().unwrap();
    assert!(seconds >= 0.0);
    assert_eq!(stdout.lines().count(), 1);

    ws.cmd()
        .arg("time")
        .arg(&tree)
        .args(["boxed", "distance"])
        .assert()
        .success()
        .stdout("NA\n");
}

#[test]
fn test_time_rejects_unknown_library() {
    let ws = Workspace::new(SCRIPTED, &[100]);
    ws.cmd()
        .args(["time", "data/tree_n100.tre", "ete3", "height"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown native library"));
}

// ===== Plan & validate =====

#[test]
fn test_plan_counts_invocations() {
    let ws = Workspace::new(SCRIPTED, &[100, 1000]);

    // height: 3 sizes x 3 libraries - 1 excluded; treeness: 1 x 3
    ws.cmd()
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("11 cell(s) x 10 replicate(s) = 110 invocation(s)"))
        .stdout(predicate::str::contains("(missing)"));

    ws.cmd()
        .args(["run", "--dry-run", "--library", "libA"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 cell(s) x 10 replicate(s) = 40 invocation(s)"));
    assert!(!ws.output().exists());
}

#[test]
fn test_validate() {
    let ws = Workspace::new(SCRIPTED, &[]);
    ws.cmd()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("libB: up to 1000 leaves"));
}

#[test]
fn test_validate_rejects_unknown_builtin() {
    let config = r#"
libraries:
  - id: treeswift
    builtin: true
"#;
    let ws = Workspace::new(config, &[]);
    ws.cmd()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Built-in libraries are arena, boxed"));
}

#[test]
fn test_missing_config() {
    let dir = TempDir::new().unwrap();
    treebench(dir.path())
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
