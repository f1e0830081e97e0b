//! Checks for external tools services depend on.
//!
//! Short-lived probes such as `appium --version` go through the
//! [`CommandExecutor`] seam so tests can substitute canned output.

use crate::error::{Result, ServiceError};
use std::process::{Command, Output};

/// Abstraction for running external commands to completion.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use loadkit_services::deps::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("appium", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), loadkit_services::error::ServiceError>(())
    /// ```
    fn run<'a>(&self, cmd: &str, args: &[&'a str]) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        Command::new(cmd)
            .args(args)
            .output()
            .map_err(ServiceError::from)
    }
}

/// Verifies that `tool` runs and exits successfully with `args`.
///
/// # Errors
///
/// Returns [`ServiceError::ToolFailed`] when the tool cannot be started or
/// exits with a failure status; the message carries its trimmed stderr.
pub fn check_tool(executor: &dyn CommandExecutor, tool: &str, args: &[&str]) -> Result<()> {
    let output = executor
        .run(tool, args)
        .map_err(|e| ServiceError::ToolFailed {
            tool: tool.to_owned(),
            message: format!("could not run {tool}: {e}"),
        })?;

    if output.status.success() {
        return Ok(());
    }

    Err(ServiceError::ToolFailed {
        tool: tool.to_owned(),
        message: stderr_message(&output),
    })
}

/// Returns trimmed stderr, or a placeholder when it is empty.
#[must_use]
pub fn stderr_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        "unknown error".to_owned()
    } else {
        trimmed.to_owned()
    }
}
