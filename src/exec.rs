use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::ToolError;

/// Captured result of a command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Output beyond the capture limit was discarded.
    pub truncated: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Bytes kept from each of stdout and stderr.
pub const DEFAULT_CAPTURE_LIMIT: u64 = 1024 * 1024;

/// Runs command lines through the platform shell with a hard timeout.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    timeout: Duration,
    capture_limit: u64,
}

impl ShellExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            capture_limit: DEFAULT_CAPTURE_LIMIT,
        }
    }

    pub fn with_capture_limit(mut self, bytes: u64) -> Self {
        self.capture_limit = bytes;
        self
    }

    /// Run `command_line`. A non-zero exit is a normal outcome; only failing to
    /// launch or hitting the timeout is an error.
    pub async fn run(&self, command_line: &str) -> Result<CommandOutput, ToolError> {
        info!(command = %command_line, "executing command");

        let mut child = shell_command(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::CommandExecution(format!("{command_line}: {e}")))?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(ToolError::CommandExecution(format!(
                "{command_line}: output pipes unavailable"
            )));
        };

        let limit = self.capture_limit;
        let collect = async {
            tokio::try_join!(
                read_capped(stdout, limit),
                read_capped(stderr, limit),
                child.wait()
            )
        };

        // Dropping `child` on timeout kills it.
        let ((stdout, out_cut), (stderr, err_cut), status) =
            tokio::time::timeout(self.timeout, collect)
                .await
                .map_err(|_| {
                    ToolError::CommandExecution(format!(
                        "command timed out after {}s: {command_line}",
                        self.timeout.as_secs()
                    ))
                })?
                .map_err(|e| ToolError::CommandExecution(format!("{command_line}: {e}")))?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: status.code(),
            truncated: out_cut || err_cut,
        };
        if result.truncated {
            warn!(limit, "command output truncated");
        }
        debug!(exit_code = ?result.exit_code, "command finished");
        Ok(result)
    }
}

/// Keep the first `limit` bytes, then drain the rest so the child never
/// blocks on a full pipe.
async fn read_capped<R: AsyncRead + Unpin>(
    mut reader: R,
    limit: u64,
) -> std::io::Result<(Vec<u8>, bool)> {
    let mut kept = Vec::new();
    (&mut reader).take(limit).read_to_end(&mut kept).await?;
    let dropped = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok((kept, dropped > 0))
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(crate::config::Settings::default().command_timeout)
    }
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command_line);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command_line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command_line);
    cmd
}

/// How commands are invoked, for prompts and diagnostics.
pub fn shell_label() -> &'static str {
    if cfg!(windows) {
        "cmd /C"
    } else {
        "sh -c"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout() {
        let out = ShellExecutor::default().run("echo hello").await.unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert!(out.success());
    }

    #[tokio::test]
    async fn nonzero_exit_is_not_an_error() {
        let out = ShellExecutor::default()
            .run("echo oops >&2; exit 3")
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stderr.trim(), "oops");
        assert!(!out.success());
    }

    #[tokio::test]
    async fn pipes_are_passed_to_the_shell() {
        let out = ShellExecutor::default()
            .run("printf 'a\\nb\\n' | wc -l")
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "2");
    }

    #[tokio::test]
    async fn large_output_is_capped() {
        let out = ShellExecutor::default()
            .with_capture_limit(1000)
            .run("head -c 5000 /dev/zero | tr '\\0' a")
            .await
            .unwrap();
        assert_eq!(out.stdout.len(), 1000);
        assert!(out.truncated);
        assert!(out.success());
    }

    #[tokio::test]
    async fn small_output_is_not_truncated() {
        let out = ShellExecutor::default().run("echo hi").await.unwrap();
        assert!(!out.truncated);
    }

    #[tokio::test]
    async fn timeout_is_execution_error() {
        let err = ShellExecutor::new(Duration::from_millis(100))
            .run("sleep 5")
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::CommandExecution(_)));
        assert!(err.to_string().contains("timed out"));
    }
}
