//! External command invocation
//!
//! All tool calls go through the [`CommandRunner`] trait so the provisioning
//! components stay independent of the host. Tests inject a scripted runner;
//! production uses [`SystemRunner`] backed by real processes.

use crate::error::{Error, Result};
use async_trait::async_trait;
use tracing::debug;

// =============================================================================
// Command Output
// =============================================================================

/// Captured result of one external command invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit code, if the process exited normally
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Map a non-zero exit to [`Error::Command`], surfacing the tool's own stderr.
pub fn require_success(command: &str, output: &CommandOutput) -> Result<()> {
    if output.success() {
        return Ok(());
    }
    let stderr = output.stderr.trim();
    let reason = if stderr.is_empty() {
        format!("exit code {:?}", output.code)
    } else {
        stderr.to_string()
    };
    Err(Error::Command {
        command: command.to_string(),
        reason,
    })
}

// =============================================================================
// Command Runner
// =============================================================================

/// Boundary trait for running external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion, capturing stdout and stderr. A failure to
    /// spawn is an error; a non-zero exit is reported through the output so
    /// probe-style callers can inspect it.
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Runner backed by real host processes
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!("exec: {} {}", program, args.join(" "));

        let output = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::Command {
                command: program.to_string(),
                reason: e.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

// =============================================================================
// Scripted Runner (test support)
// =============================================================================


#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_require_success_passes_zero_exit() {
        let output = CommandOutput {
            code: Some(0),
            stdout: "ok".into(),
            stderr: String::new(),
        };
        assert!(require_success("mkfs.xfs", &output).is_ok());
    }

    #[test]
    fn test_require_success_surfaces_stderr() {
        let output = CommandOutput {
            code: Some(1),
            stdout: String::new(),
            stderr: "mdadm: cannot open /dev/nvme1n1: Device or resource busy\n".into(),
        };
        let err = require_success("mdadm --create", &output).unwrap_err();
        assert_matches!(err, Error::Command { ref command, ref reason }
            if command == "mdadm --create" && reason.contains("resource busy"));
    }

    #[test]
    fn test_require_success_reports_code_without_stderr() {
        let output = CommandOutput {
            code: Some(2),
            stdout: String::new(),
            stderr: String::new(),
        };
        let err = require_success("blkid", &output).unwrap_err();
        assert_matches!(err, Error::Command { ref reason, .. } if reason.contains('2'));
    }
}
