// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Timing adapter contract and the process-isolated implementation.
//!
//! Every invocation runs in its own child process and process group so a
//! crash, runaway memory use or library-global cache can never leak into
//! another measurement. The child is invoked as
//! `<program> <args...> <artifact> <library> <task>` and must print either
//! a non-negative number of seconds or `NA`.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use crate::config::{AdapterKind, Config};
use crate::error::InvocationError;
use crate::matrix::MatrixCell;
use crate::types::LibraryId;

/// What an adapter prints when a library cannot perform a task.
pub const UNSUPPORTED_SENTINEL: &str = "NA";

/// Subcommand the treebench binary exposes for its built-in libraries.
pub const BUILTIN_SUBCOMMAND: &str = "time";

/// Longest stderr excerpt carried in a crash diagnostic.
const STDERR_TAIL_BYTES: usize = 2048;

/// Longest stdout excerpt carried in a malformed-output diagnostic.
const OUTPUT_EXCERPT_BYTES: usize = 256;

/// Stdout beyond this is malformed; the adapter is killed without waiting for it.
const STDOUT_LIMIT_BYTES: usize = 4096;

/// How long pipes may stay open after the adapter itself has exited.
const PIPE_GRACE: Duration = Duration::from_secs(2);

/// Outcome of one successful adapter invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// Computation time in seconds, loading excluded.
    Elapsed(f64),
    /// The library cannot perform the task.
    Unsupported,
}

impl Measurement {
    /// Seconds, if this is a timing.
    pub fn seconds(&self) -> Option<f64> {
        match self {
            Measurement::Elapsed(seconds) => Some(*seconds),
            Measurement::Unsupported => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Measurement::Elapsed(_))
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Elapsed(seconds) => write!(f, "{}", seconds),
            Measurement::Unsupported => f.write_str(UNSUPPORTED_SENTINEL),
        }
    }
}

/// Parse what an adapter printed on stdout.
pub fn parse_output(stdout: &str) -> Result<Measurement, InvocationError> {
    let trimmed = stdout.trim();
    if trimmed == UNSUPPORTED_SENTINEL {
        return Ok(Measurement::Unsupported);
    }

    match trimmed.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(Measurement::Elapsed(seconds)),
        _ => Err(InvocationError::MalformedOutput {
            output: excerpt(trimmed, OUTPUT_EXCERPT_BYTES, false),
        }),
    }
}

/// One replicate to be measured.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub cell: &'a MatrixCell,
    /// One-based replicate number.
    pub replicate: u32,
    /// Input tree for the cell's size.
    pub artifact: &'a Path,
}

/// Anything that can time one (task, artifact, library) computation.
pub trait TimingAdapter {
    /// Measure one replicate. `Err` is always fatal for the sweep.
    fn measure(
        &self,
        invocation: &Invocation<'_>,
    ) -> impl Future<Output = Result<Measurement, InvocationError>>;
}

/// Program and leading arguments used to launch one library's adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl AdapterCommand {
    pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Re-invoke the treebench binary at `self_exe` as the adapter.
    pub fn builtin(self_exe: &Path) -> Self {
        Self::new(self_exe, [BUILTIN_SUBCOMMAND])
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn command_for(&self, invocation: &Invocation<'_>) -> Command {
        let mut command = std::process::Command::new(&self.program);
        command
            .args(&self.args)
            .arg(invocation.artifact)
            .arg(invocation.cell.library.as_str())
            .arg(invocation.cell.task.name())
            // New process group so a timeout can kill grandchildren too.
            .process_group(0);
        Command::from(command)
    }
}

impl fmt::Display for AdapterCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs each invocation as an isolated child process with a time bound.
#[derive(Debug, Clone)]
pub struct ProcessAdapter {
    commands: BTreeMap<LibraryId, AdapterCommand>,
    timeout: Duration,
    active: InterruptHandle,
}

impl ProcessAdapter {
    /// Create an adapter with no libraries registered.
    pub fn new(timeout: Duration) -> Self {
        Self {
            commands: BTreeMap::new(),
            timeout,
            active: InterruptHandle::default(),
        }
    }

    /// Register every configured library. Built-in libraries run `self_exe`.
    pub fn from_config(config: &Config, self_exe: &Path) -> Self {
        let mut adapter = Self::new(config.sweep.timeout);
        for library in &config.libraries {
            let command = match &library.adapter {
                AdapterKind::Builtin => AdapterCommand::builtin(self_exe),
                AdapterKind::Command { program, args } => AdapterCommand::new(program, args),
            };
            adapter.register(library.id.clone(), command);
        }
        adapter
    }

    pub fn register(&mut self, library: LibraryId, command: AdapterCommand) {
        self.commands.insert(library, command);
    }

    /// Builder-style [`ProcessAdapter::register`].
    pub fn with_command(mut self, library: LibraryId, command: AdapterCommand) -> Self {
        self.register(library, command);
        self
    }

    pub fn command(&self, library: &LibraryId) -> Option<&AdapterCommand> {
        self.commands.get(library)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Handle that can kill whichever adapter is running right now.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.active.clone()
    }

    async fn invoke(
        &self,
        adapter: &AdapterCommand,
        invocation: &Invocation<'_>,
    ) -> Result<Measurement, InvocationError> {
        let mut command = adapter.command_for(invocation);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let mut child = command.spawn().map_err(|source| InvocationError::Spawn {
            program: adapter.program.display().to_string(),
            source,
        })?;
        let pgid = child.id().and_then(|pid| i32::try_from(pid).ok());
        // Left set if this future is dropped mid-flight, so an interrupt can still reach it.
        self.active.set(pgid);

        tracing::debug!(
            cell = %invocation.cell,
            replicate = invocation.replicate,
            pid = ?pgid,
            command = %adapter,
            "Spawned adapter"
        );

        let outcome = self.collect(&mut child, pgid, invocation).await;
        self.active.clear();
        let Collected { status, stdout, stderr } = outcome?;

        tracing::debug!(
            cell = %invocation.cell,
            replicate = invocation.replicate,
            status = %status,
            wall_ms = started.elapsed().as_millis() as u64,
            "Adapter finished"
        );

        if !status.success() {
            return Err(InvocationError::Crashed {
                status: status.to_string(),
                stderr: excerpt(&String::from_utf8_lossy(&stderr), STDERR_TAIL_BYTES, true),
            });
        }
        if stdout.overflowed {
            return Err(flooded(&stdout.bytes));
        }

        parse_output(&String::from_utf8_lossy(&stdout.bytes))
    }

    /// Wait for the child and its output, with every buffer bounded.
    async fn collect(
        &self,
        child: &mut Child,
        pgid: Option<i32>,
        invocation: &Invocation<'_>,
    ) -> Result<Collected, InvocationError> {
        let mut stdout = child.stdout.take().ok_or_else(|| InvocationError::Io {
            context: "capturing adapter stdout",
            source: std::io::Error::other("stdout was not piped"),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| InvocationError::Io {
            context: "capturing adapter stderr",
            source: std::io::Error::other("stderr was not piped"),
        })?;
        let mut stderr_tail = tokio::spawn(read_tail(stderr, STDERR_TAIL_BYTES));

        let waited = tokio::time::timeout(self.timeout, async {
            let mut head = std::pin::pin!(read_head(&mut stdout, STDOUT_LIMIT_BYTES));
            let first = tokio::select! {
                read = &mut head => First::Output(read),
                status = child.wait() => First::Exited(status),
            };

            let done: std::io::Result<(Option<ExitStatus>, Captured)> = match first {
                First::Output(Ok(captured)) if captured.overflowed => Ok((None, captured)),
                First::Output(Ok(captured)) => child.wait().await.map(|status| (Some(status), captured)),
                First::Output(Err(e)) => Err(e),
                First::Exited(Ok(status)) => {
                    let graced = tokio::time::timeout(PIPE_GRACE, &mut head).await;
                    let read = match graced {
                        Ok(read) => read,
                        Err(_) => {
                            tracing::warn!(
                                cell = %invocation.cell,
                                replicate = invocation.replicate,
                                "Adapter exited but its stdout is still held open, killing process group"
                            );
                            kill_process_group(pgid);
                            head.await
                        }
                    };
                    read.map(|captured| (Some(status), captured))
                }
                First::Exited(Err(e)) => Err(e),
            };
            done
        })
        .await;

        let (status, captured) = match waited {
            Ok(Ok(done)) => done,
            Ok(Err(source)) => {
                stderr_tail.abort();
                return Err(InvocationError::Io {
                    context: "collecting adapter output",
                    source,
                });
            }
            Err(_) => {
                tracing::warn!(
                    cell = %invocation.cell,
                    replicate = invocation.replicate,
                    pid = ?pgid,
                    limit_ms = self.timeout.as_millis() as u64,
                    "Adapter timed out, killing process group"
                );
                kill_process_group(pgid);
                // Reap the direct child; the group is already gone.
                let _ = child.kill().await;
                stderr_tail.abort();
                return Err(InvocationError::Timeout {
                    limit: self.timeout,
                });
            }
        };

        let Some(status) = status else {
            tracing::warn!(
                cell = %invocation.cell,
                replicate = invocation.replicate,
                limit_bytes = STDOUT_LIMIT_BYTES,
                "Adapter flooded stdout, killing process group"
            );
            kill_process_group(pgid);
            let _ = child.kill().await;
            stderr_tail.abort();
            return Err(flooded(&captured.bytes));
        };

        let stderr = match tokio::time::timeout(PIPE_GRACE, &mut stderr_tail).await {
            Ok(Ok(Ok(tail))) => tail,
            Ok(Ok(Err(source))) => {
                return Err(InvocationError::Io {
                    context: "reading adapter stderr",
                    source,
                })
            }
            Ok(Err(_)) => Vec::new(),
            // Held open by a process outside the group; the tail is only diagnostic.
            Err(_) => {
                stderr_tail.abort();
                Vec::new()
            }
        };

        Ok(Collected {
            status,
            stdout: captured,
            stderr,
        })
    }
}

/// Process group of the adapter currently running, shared with interrupt handlers.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    pgid: Arc<AtomicI32>,
}

impl InterruptHandle {
    fn set(&self, pgid: Option<i32>) {
        self.pgid.store(pgid.unwrap_or(0), Ordering::SeqCst);
    }

    fn clear(&self) {
        self.pgid.store(0, Ordering::SeqCst);
    }

    /// Process group of the in-flight adapter, if any.
    pub fn active(&self) -> Option<i32> {
        Some(self.pgid.load(Ordering::SeqCst)).filter(|&pgid| pgid > 0)
    }

    /// SIGKILL the in-flight adapter's process group. Returns the group killed.
    pub fn kill_active(&self) -> Option<i32> {
        let pgid = Some(self.pgid.swap(0, Ordering::SeqCst)).filter(|&pgid| pgid > 0);
        kill_process_group(pgid);
        pgid
    }
}

/// Which side of an invocation finished first.
enum First {
    Output(std::io::Result<Captured>),
    Exited(std::io::Result<ExitStatus>),
}

/// Leading stdout bytes, and whether the adapter wrote more than the limit.
#[derive(Debug)]
struct Captured {
    bytes: Vec<u8>,
    overflowed: bool,
}

struct Collected {
    status: ExitStatus,
    stdout: Captured,
    stderr: Vec<u8>,
}

/// Read until EOF or until more than `limit` bytes have arrived.
async fn read_head<R: AsyncRead + Unpin>(reader: R, limit: usize) -> std::io::Result<Captured> {
    let mut bytes = Vec::new();
    reader.take(limit as u64 + 1).read_to_end(&mut bytes).await?;
    let overflowed = bytes.len() > limit;
    bytes.truncate(limit);
    Ok(Captured { bytes, overflowed })
}

/// Read until EOF, keeping only the last `limit` bytes.
async fn read_tail<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut tail = VecDeque::with_capacity(limit);
    let mut chunk = [0u8; 4096];
    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        tail.extend(&chunk[..read]);
        if tail.len() > limit {
            tail.drain(..tail.len() - limit);
        }
    }
    Ok(tail.into())
}

fn flooded(head: &[u8]) -> InvocationError {
    InvocationError::MalformedOutput {
        output: excerpt(&String::from_utf8_lossy(head), OUTPUT_EXCERPT_BYTES, false),
    }
}

impl TimingAdapter for ProcessAdapter {
    async fn measure(&self, invocation: &Invocation<'_>) -> Result<Measurement, InvocationError> {
        let adapter = self
            .commands
            .get(&invocation.cell.library)
            .ok_or_else(|| InvocationError::NoAdapter {
                library: invocation.cell.library.clone(),
            })?;
        self.invoke(adapter, invocation).await
    }
}

/// SIGKILL every process in group `pgid`.
fn kill_process_group(pgid: Option<i32>) {
    let Some(raw) = pgid else {
        return;
    };
    if let Err(errno) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        tracing::debug!(pgid = raw, error = %errno, "killpg failed");
    }
}

/// Trimmed excerpt of at most `limit` bytes, from the end when `tail` is set.
fn excerpt(text: &str, limit: usize, tail: bool) -> String {
    let text = text.trim();
    if text.len() <= limit {
        return text.to_string();
    }
    if tail {
        let mut start = text.len() - limit;
        while !text.is_char_boundary(start) {
            start += 1;
        }
        format!("...{}", &text[start..])
    } else {
        let mut end = limit;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    }
}
