// Run an external tool with a deadline
use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::ExtractionError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Stdout on success, `ToolFailed` otherwise.
    pub fn into_stdout(self, tool: &str) -> Result<String, ExtractionError> {
        if self.status.success() {
            Ok(self.stdout)
        } else {
            Err(ExtractionError::ToolFailed {
                tool: tool.to_string(),
                code: self.status.code(),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buf);
        }
        buf
    })
}

fn collect(handle: JoinHandle<Vec<u8>>) -> String {
    let bytes = handle.join().unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn kill(child: &mut Child, tool: &str) {
    if let Err(e) = child.kill() {
        warn!(tool, error = %e, "failed to kill timed-out process");
    }
    let _ = child.wait();
}

/// Spawn `cmd`, optionally feed `input` on stdin, and wait at most
/// `timeout` for it to exit. The child is killed on timeout.
pub fn run_with_timeout(
    mut cmd: Command,
    tool: &str,
    input: Option<&str>,
    timeout: Duration,
) -> Result<CommandOutput, ExtractionError> {
    cmd.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|source| ExtractionError::Spawn {
        tool: tool.to_string(),
        source,
    })?;

    let writer = match (input, child.stdin.take()) {
        (Some(input), Some(mut stdin)) => {
            let input = input.to_owned();
            Some(thread::spawn(move || {
                // closing stdin tells the tool the input is complete
                let _ = stdin.write_all(input.as_bytes());
            }))
        }
        _ => None,
    };
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= timeout {
            kill(&mut child, tool);
            return Err(ExtractionError::Timeout {
                tool: tool.to_string(),
                after: timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    if let Some(writer) = writer {
        let _ = writer.join();
    }
    let output = CommandOutput {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    };
    debug!(tool, status = ?output.status, elapsed = ?started.elapsed(), "command finished");
    Ok(output)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "printf hello"]);
        let out = run_with_timeout(cmd, "sh", None, Duration::from_secs(5)).unwrap();
        assert!(out.status.success());
        assert_eq!(out.stdout, "hello");
    }

    #[test]
    fn feeds_stdin() {
        let cmd = Command::new("cat");
        let out = run_with_timeout(cmd, "cat", Some("referto"), Duration::from_secs(5)).unwrap();
        assert_eq!(out.into_stdout("cat").unwrap(), "referto");
    }

    #[test]
    fn nonzero_exit_is_tool_failure() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo broken >&2; exit 3"]);
        let out = run_with_timeout(cmd, "sh", None, Duration::from_secs(5)).unwrap();
        match out.into_stdout("sh") {
            Err(ExtractionError::ToolFailed { code, stderr, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn slow_tool_times_out() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let started = Instant::now();
        let err = run_with_timeout(cmd, "sleep", None, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, ExtractionError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_binary_is_spawn_error() {
        let cmd = Command::new("definitely-not-a-real-tool-xyz");
        let err = run_with_timeout(cmd, "xyz", None, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ExtractionError::Spawn { .. }));
    }
}
