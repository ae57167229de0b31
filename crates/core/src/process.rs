//! Process execution utilities
//!
//! External tools (npm and friends) are invoked through the [`CommandRunner`]
//! trait so orchestration code can be exercised with a scripted runner in
//! tests. The system runner provides:
//! - Output capture
//! - Directory context
//! - Timeouts (a timed out child is killed and reported as an error)

use crate::error::{Error, Result};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Interval between exit polls while waiting on a child with a timeout
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of a command execution
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
    /// Exit code of the command
    pub exit_code: i32,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandResult {
    /// Create from std::process::Output
    pub fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Build a result from an exit code and captured streams
    pub fn with_exit_code(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: exit_code == 0,
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Get combined output (stdout + stderr)
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    /// Turn a non-zero exit into a `CommandFailed` error
    pub fn into_checked(self, display: &str) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            let tail = last_lines(&self.combined_output(), 5);
            let mut err = Error::command_failed(display, self.exit_code);
            if !tail.is_empty() {
                err = err.with_context(tail);
            }
            Err(err)
        }
    }
}

/// A fully described child process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to run
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory
    pub cwd: Option<PathBuf>,
    /// Kill the child after this long
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    /// Create a spec from a program and its arguments
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            timeout: None,
        }
    }

    /// Create a spec from an argv vector (first element is the program)
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::process("Empty command line"))?;
        Ok(Self::new(program.clone(), args.iter().cloned()))
    }

    /// Run in the given directory
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Kill the child if it outlives `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Shell-like rendering for log lines
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Runs external commands
pub trait CommandRunner {
    /// Run the command to completion and capture its output.
    ///
    /// A non-zero exit is *not* an error here; spawn failures and timeouts are.
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult>;
}

/// Runner backed by `std::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::command_not_found(&spec.program).with_source(e)
            } else {
                Error::process(format!("Failed to execute {}: {}", spec.program, e)).with_source(e)
            }
        })?;

        match spec.timeout {
            None => {
                let output = child
                    .wait_with_output()
                    .map_err(|e| Error::process(format!("Failed to wait for {}: {}", spec.program, e)))?;
                Ok(CommandResult::from_output(output))
            }
            Some(timeout) => wait_with_timeout(child, timeout, spec),
        }
    }
}

fn wait_with_timeout(mut child: Child, timeout: Duration, spec: &CommandSpec) -> Result<CommandResult> {
    // Drain pipes on their own threads so a chatty child cannot block on a full pipe.
    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if start.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::timeout(&spec.display(), timeout.as_secs()));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                return Err(Error::process(format!("Failed to wait for {}: {}", spec.program, e)))
            }
        }
    };

    let stdout = stdout.map(join_reader).unwrap_or_default();
    let stderr = stderr.map(join_reader).unwrap_or_default();

    Ok(CommandResult {
        success: status.success(),
        exit_code: status.code().unwrap_or(-1),
        stdout,
        stderr,
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: thread::JoinHandle<Vec<u8>>) -> String {
    handle
        .join()
        .map(|buf| String::from_utf8_lossy(&buf).to_string())
        .unwrap_or_default()
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

/// Get the path to a command
pub fn which_command(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}
