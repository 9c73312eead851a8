//! Subprocess execution boundary.
//!
//! Every `git` and `gh` invocation goes through [`CommandRunner`]. The
//! directory classifier and branch sync resolver only ever see a
//! [`CommandResult`], which keeps them testable against scripted output.

use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

/// Default per-invocation timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default cap on captured bytes per output stream (10 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const READ_CHUNK: usize = 8 * 1024;

/// Why a command did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandFailure {
    #[error("failed to start `{program}`: {reason}")]
    Spawn { program: String, reason: String },

    #[error("exited with status {0}")]
    NonZeroExit(i32),

    #[error("terminated by signal")]
    Terminated,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("output exceeded {0} bytes")]
    OutputLimit(usize),

    #[error("failed while waiting for process: {0}")]
    Wait(String),
}

/// Outcome of a single command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub error_detail: Option<CommandFailure>,
}

impl CommandResult {
    /// A successful result with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
            error_detail: None,
        }
    }

    /// A failed result with the given stderr and failure detail.
    pub fn failed(stderr: impl Into<String>, detail: CommandFailure) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
            error_detail: Some(detail),
        }
    }

    /// Best human-readable description of a failure.
    ///
    /// Prefers stderr, then stdout, then the failure detail.
    pub fn message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        self.error_detail
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default()
    }
}

/// Executes a program with arguments in a working directory.
///
/// Arguments are passed as a vector, never through a shell, so user text
/// such as commit messages is not interpreted.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> CommandResult;
}

/// Runs real subprocesses with a timeout and a per-stream output cap.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
    max_output_bytes: usize,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            DEFAULT_MAX_OUTPUT_BYTES,
        )
    }
}

impl SystemRunner {
    pub fn new(timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            timeout,
            max_output_bytes,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_output_bytes(&self) -> usize {
        self.max_output_bytes
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> CommandResult {
        debug!(program, ?args, cwd = %cwd.display(), "running command");

        let mut child = match Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                debug!(program, error = %e, "spawn failed");
                return CommandResult::failed(
                    String::new(),
                    CommandFailure::Spawn {
                        program: program.to_string(),
                        reason: e.to_string(),
                    },
                );
            }
        };

        let stdout = child
            .stdout
            .take()
            .map(|s| Capture::spawn(s, self.max_output_bytes));
        let stderr = child
            .stderr
            .take()
            .map(|s| Capture::spawn(s, self.max_output_bytes));

        let deadline = Instant::now() + self.timeout;
        let waited: std::result::Result<ExitStatus, CommandFailure> = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    break Err(CommandFailure::Timeout(self.timeout));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    break Err(CommandFailure::Wait(e.to_string()));
                }
            }
        };

        // After a timeout a grandchild may still hold the pipes open, so the
        // readers are only joined when the process exited on its own.
        let join = waited.is_ok();
        let (stdout, stdout_overflow) = stdout.map(|c| c.finish(join)).unwrap_or_default();
        let (stderr, stderr_overflow) = stderr.map(|c| c.finish(join)).unwrap_or_default();

        let detail = match waited {
            Err(failure) => Some(failure),
            Ok(_) if stdout_overflow || stderr_overflow => {
                Some(CommandFailure::OutputLimit(self.max_output_bytes))
            }
            Ok(status) if status.success() => None,
            Ok(status) => Some(
                status
                    .code()
                    .map(CommandFailure::NonZeroExit)
                    .unwrap_or(CommandFailure::Terminated),
            ),
        };

        debug!(program, ?args, success = detail.is_none(), ?detail, "command finished");

        CommandResult {
            success: detail.is_none(),
            stdout,
            stderr,
            error_detail: detail,
        }
    }
}

#[derive(Default)]
struct CappedBuffer {
    data: Vec<u8>,
    overflowed: bool,
}

impl CappedBuffer {
    fn push(&mut self, bytes: &[u8], cap: usize) {
        if self.overflowed {
            return;
        }
        let room = cap.saturating_sub(self.data.len());
        if bytes.len() > room {
            self.data.extend_from_slice(&bytes[..room]);
            self.overflowed = true;
        } else {
            self.data.extend_from_slice(bytes);
        }
    }
}

/// Background reader that drains a pipe into a capped buffer.
///
/// The pipe keeps being drained after the cap is hit so the child never
/// blocks on a full pipe.
struct Capture {
    buffer: Arc<Mutex<CappedBuffer>>,
    handle: Option<JoinHandle<()>>,
}

impl Capture {
    fn spawn<R: Read + Send + 'static>(mut source: R, cap: usize) -> Self {
        let buffer = Arc::new(Mutex::new(CappedBuffer::default()));
        let sink = Arc::clone(&buffer);

        let handle = thread::spawn(move || {
            let mut chunk = [0u8; READ_CHUNK];
            loop {
                match source.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        if let Ok(mut buf) = sink.lock() {
                            buf.push(&chunk[..n], cap);
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
        });

        Self {
            buffer,
            handle: Some(handle),
        }
    }

    fn finish(mut self, join: bool) -> (String, bool) {
        if join {
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
        match self.buffer.lock() {
            Ok(buf) => (
                String::from_utf8_lossy(&buf.data).into_owned(),
                buf.overflowed,
            ),
            Err(_) => (String::new(), false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_command_result_ok_has_no_detail() {
        let result = CommandResult::ok("done");
        assert!(result.success);
        assert_eq!(result.stdout, "done");
        assert!(result.error_detail.is_none());
    }

    #[test]
    fn test_command_result_message_prefers_stderr() {
        let mut result = CommandResult::failed("fatal: boom\n", CommandFailure::NonZeroExit(1));
        result.stdout = "some stdout".to_string();
        assert_eq!(result.message(), "fatal: boom");
    }

    #[test]
    fn test_command_result_message_falls_back_to_detail() {
        let result =
            CommandResult::failed("", CommandFailure::Timeout(Duration::from_secs(300)));
        assert_eq!(result.message(), "timed out after 300s");
    }

    #[test]
    fn test_capped_buffer_truncates_and_flags_overflow() {
        let mut buf = CappedBuffer::default();
        buf.push(b"hello", 8);
        assert!(!buf.overflowed);
        buf.push(b"world", 8);
        assert!(buf.overflowed);
        assert_eq!(buf.data, b"hellowor");
        buf.push(b"more", 8);
        assert_eq!(buf.data.len(), 8);
    }

    #[test]
    fn test_spawn_failure_is_reported_not_panicked() {
        let dir = TempDir::new().unwrap();
        let runner = SystemRunner::default();
        let result = runner.run("autopush-definitely-not-a-program", &[], dir.path());
        assert!(!result.success);
        assert!(matches!(
            result.error_detail,
            Some(CommandFailure::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout_of_successful_command() {
        let dir = TempDir::new().unwrap();
        let runner = SystemRunner::default();
        let result = runner.run("sh", &["-c", "echo hello"], dir.path());
        assert!(result.success);
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_failure_with_code() {
        let dir = TempDir::new().unwrap();
        let runner = SystemRunner::default();
        let result = runner.run("sh", &["-c", "echo oops >&2; exit 3"], dir.path());
        assert!(!result.success);
        assert_eq!(result.error_detail, Some(CommandFailure::NonZeroExit(3)));
        assert_eq!(result.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_in_requested_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let runner = SystemRunner::default();
        let result = runner.run("ls", &[], dir.path());
        assert!(result.success);
        assert!(result.stdout.contains("marker.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_reports_failure() {
        let dir = TempDir::new().unwrap();
        let runner = SystemRunner::new(Duration::from_millis(200), DEFAULT_MAX_OUTPUT_BYTES);
        let started = Instant::now();
        let result = runner.run("sleep", &["5"], dir.path());
        assert!(!result.success);
        assert_eq!(
            result.error_detail,
            Some(CommandFailure::Timeout(Duration::from_millis(200)))
        );
        assert!(result.message().contains("200ms"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_output_limit_reports_failure() {
        let dir = TempDir::new().unwrap();
        let runner = SystemRunner::new(Duration::from_secs(30), 1024);
        let result = runner.run(
            "sh",
            &["-c", "i=0; while [ $i -lt 500 ]; do echo 0123456789; i=$((i+1)); done"],
            dir.path(),
        );
        assert!(!result.success);
        assert_eq!(result.error_detail, Some(CommandFailure::OutputLimit(1024)));
        assert_eq!(result.stdout.len(), 1024);
    }
}
