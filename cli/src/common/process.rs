//! # Echelon Process Execution (`common::process`)
//!
//! File: cli/src/common/process.rs
//!
//! ## Overview
//!
//! This module runs one external program to completion and hands back what it
//! wrote to stdout and stderr. It is the only place Echelon creates child
//! processes.
//!
//! ## Architecture
//!
//! - **`ExecContext`**: the working directory and environment a child is
//!   started with. Commands build it from the current process with
//!   `ExecContext::from_process`; tests construct their own.
//! - **`Invocation`**: either `Direct` (the program is exec'd with a discrete
//!   argument vector) or `Shell` (the full command line is handed to
//!   `<interpreter> -c`). Shell mode makes every metacharacter in the program
//!   and its arguments live and is only used when explicitly requested.
//! - **`run_process`**: spawns the child with all three standard streams piped,
//!   writes the optional stdin payload and closes the pipe, drains stdout and
//!   stderr concurrently (each bounded by an optional byte cap), and waits for
//!   exit.
//!
//! A run succeeds only when the child exits with a success status. A spawn
//! failure yields `EchelonError::Spawn`; any other exit yields
//! `EchelonError::ExternalCommand` carrying the captured stderr.
//!
//! There is no timeout: a child that never exits blocks the caller.
//!
//! ## Usage
//!
//! ```rust
//! let ctx = ExecContext::from_process()?;
//! let args = vec!["-n".to_string(), "hello".to_string()];
//! let request = ProcessRequest {
//!     program: "echo",
//!     args: &args,
//!     command_line: "echo -n hello",
//!     stdin: None,
//!     invocation: &Invocation::Direct,
//!     max_capture_bytes: None,
//! };
//! let output = run_process(&ctx, &request).await?;
//! assert_eq!(output.stdout, "hello");
//! ```
//!
use crate::core::error::{EchelonError, Result};
use anyhow::anyhow;
use std::collections::HashMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Working directory and environment a child process is started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecContext {
    pub working_directory: PathBuf,
    pub environment: HashMap<OsString, OsString>,
}

impl ExecContext {
    pub fn new(working_directory: impl Into<PathBuf>, environment: HashMap<OsString, OsString>) -> Self {
        Self {
            working_directory: working_directory.into(),
            environment,
        }
    }

    /// Captures the current directory and the full inherited environment.
    pub fn from_process() -> Result<Self> {
        let working_directory = std::env::current_dir()
            .map_err(|e| anyhow!(EchelonError::FileSystem(format!("Failed to get current directory: {}", e))))?;
        Ok(Self::new(working_directory, std::env::vars_os().collect()))
    }

    /// Same environment, different working directory.
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = dir.into();
        self
    }
}

/// How the child process is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Execute the program directly with a discrete argument vector.
    Direct,
    /// Pass the whole command line to `<interpreter> -c`.
    Shell { interpreter: String },
}

/// Everything `run_process` needs to know about one run.
#[derive(Debug)]
pub struct ProcessRequest<'a> {
    pub program: &'a str,
    pub args: &'a [String],
    /// Human-readable command line; also the script body in shell mode.
    pub command_line: &'a str,
    /// Payload written to the child's stdin before the pipe is closed.
    pub stdin: Option<&'a str>,
    pub invocation: &'a Invocation,
    /// Per-stream cap on captured bytes. `None` keeps everything.
    pub max_capture_bytes: Option<usize>,
}

/// Captured streams of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Bytes read from one pipe, plus how many were thrown away over the cap.
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    discarded: usize,
}

impl Captured {
    fn into_text(self, stream: &str) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.discarded > 0 {
            warn!(
                "Captured {} exceeded the capture limit; {} bytes discarded",
                stream, self.discarded
            );
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&format!(
                "[echelon: output truncated, {} bytes discarded]",
                self.discarded
            ));
        }
        text
    }
}

/// Reads `reader` to EOF, keeping at most `limit` bytes.
///
/// Bytes past the limit are still read so the child never blocks on a full
/// pipe.
async fn read_capped<R>(mut reader: R, limit: Option<usize>) -> std::io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let mut captured = Captured::default();
    let mut buf = [0u8; READ_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let keep = match limit {
            Some(limit) => limit.saturating_sub(captured.bytes.len()).min(n),
            None => n,
        };
        captured.bytes.extend_from_slice(&buf[..keep]);
        captured.discarded += n - keep;
    }
    if captured.discarded > 0 {
        // Don't leave half a character in front of the marker.
        let partial = incomplete_utf8_tail(&captured.bytes);
        captured.bytes.truncate(captured.bytes.len() - partial);
        captured.discarded += partial;
    }
    Ok(captured)
}

/// Length of a UTF-8 sequence cut off at the end of `bytes`, or 0.
fn incomplete_utf8_tail(bytes: &[u8]) -> usize {
    let start = bytes.len().saturating_sub(3);
    for i in (start..bytes.len()).rev() {
        let width = match bytes[i] {
            0x80..=0xBF => continue,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        let present = bytes.len() - i;
        return if present < width { present } else { 0 };
    }
    0
}

fn build_command(ctx: &ExecContext, request: &ProcessRequest<'_>) -> Command {
    let mut cmd = match request.invocation {
        Invocation::Direct => {
            let mut cmd = Command::new(request.program);
            cmd.args(request.args);
            cmd
        }
        Invocation::Shell { interpreter } => {
            let mut cmd = Command::new(interpreter);
            cmd.arg("-c").arg(request.command_line);
            cmd
        }
    };
    cmd.current_dir(&ctx.working_directory)
        .env_clear()
        .envs(&ctx.environment)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Runs one child process to completion and returns its captured output.
///
/// # Errors
///
/// - `EchelonError::Spawn` if the program (or shell) cannot be started.
/// - `EchelonError::ExternalCommand` if it exits with a non-success status
///   or is killed by a signal. The captured stderr is part of the error.
/// - `EchelonError::Io` if reading the pipes or waiting for the child fails.
pub async fn run_process(ctx: &ExecContext, request: &ProcessRequest<'_>) -> Result<ProcessOutput> {
    debug!(
        "Spawning {:?} in {} (invocation: {:?})",
        request.command_line,
        ctx.working_directory.display(),
        request.invocation
    );
    let mut child = build_command(ctx, request).spawn().map_err(|e| {
        anyhow!(EchelonError::Spawn {
            command: request.command_line.to_string(),
            message: e.to_string(),
        })
    })?;

    let stdin_pipe = child.stdin.take();
    let stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!(EchelonError::Io("child stdout was not piped".to_string())))?;
    let stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!(EchelonError::Io("child stderr was not piped".to_string())))?;

    let payload = request.stdin;
    let feed_stdin = async move {
        // Dropping the pipe at the end of this block is what signals EOF.
        if let (Some(mut pipe), Some(payload)) = (stdin_pipe, payload) {
            match pipe.write_all(payload.as_bytes()).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!("Child closed stdin before reading all input");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    };

    let (stdin_result, stdout_result, stderr_result) = tokio::join!(
        feed_stdin,
        read_capped(stdout_pipe, request.max_capture_bytes),
        read_capped(stderr_pipe, request.max_capture_bytes),
    );
    let io_error = |what: &str, e: std::io::Error| {
        anyhow!(EchelonError::Io(format!(
            "{} for '{}': {}",
            what, request.command_line, e
        )))
    };
    stdin_result.map_err(|e| io_error("Failed to write stdin", e))?;
    let stdout = stdout_result
        .map_err(|e| io_error("Failed to read stdout", e))?
        .into_text("stdout");
    let stderr = stderr_result
        .map_err(|e| io_error("Failed to read stderr", e))?
        .into_text("stderr");

    let status = child
        .wait()
        .await
        .map_err(|e| io_error("Failed to wait for process", e))?;

    if status.success() {
        debug!("Process {:?} exited successfully", request.command_line);
        Ok(ProcessOutput { stdout, stderr })
    } else {
        let status = match status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        warn!("Process {:?} failed ({})", request.command_line, status);
        Err(anyhow!(EchelonError::ExternalCommand {
            cmd: request.command_line.to_string(),
            status,
            stderr,
        }))
    }
}
