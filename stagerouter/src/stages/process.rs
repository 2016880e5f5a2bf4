//! Executor that spawns the stage executable as a child process.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::{ExecutionResult, StageExecutor};

/// Spawns stage executables and scrapes their output.
///
/// The artifact is the last non-blank line of standard output. That
/// convention is kept entirely inside this type.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor {
    dry_run: bool,
}

impl ProcessExecutor {
    /// Creates an executor that spawns processes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor that never spawns anything.
    #[must_use]
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

/// Returns the last line of `stdout` that is not blank, trimmed.
///
/// Returns an empty string if every line is blank.
#[must_use]
pub fn last_non_blank_line(stdout: &str) -> &str {
    stdout
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

#[async_trait]
impl StageExecutor for ProcessExecutor {
    fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    async fn run(&self, executable: &Path, input: &str) -> ExecutionResult {
        if self.dry_run {
            return ExecutionResult::dry_run(format!(
                "would run {} with {}",
                executable.display(),
                input
            ));
        }

        debug!(executable = %executable.display(), input, "Spawning stage executable");
        let output = Command::new(executable)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(err) => {
                return ExecutionResult::failed(
                    format!("failed to spawn {}: {err}", executable.display()),
                    None,
                );
            }
        };

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            ExecutionResult::succeeded(last_non_blank_line(&stdout))
        } else {
            ExecutionResult::failed(
                String::from_utf8_lossy(&output.stderr).into_owned(),
                output.status.code(),
            )
        }
    }
}
