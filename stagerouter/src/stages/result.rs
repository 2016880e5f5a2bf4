//! Result of invoking one stage executable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a stage invocation reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ExecutionResult {
    /// Exited zero. `artifact` is empty when the stage produced nothing.
    Succeeded {
        /// Reported artifact path.
        artifact: String,
    },
    /// Exited non-zero, was killed, or could not be spawned.
    Failed {
        /// Captured standard error, verbatim.
        stderr: String,
        /// Exit code; absent when killed by a signal or never spawned.
        exit_code: Option<i32>,
    },
    /// Dry-run: nothing was spawned.
    DryRun {
        /// Human-readable description of what would have run.
        command: String,
    },
}

impl ExecutionResult {
    /// Creates a success result.
    #[must_use]
    pub fn succeeded(artifact: impl Into<String>) -> Self {
        Self::Succeeded {
            artifact: artifact.into(),
        }
    }

    /// Creates a failure result.
    #[must_use]
    pub fn failed(stderr: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::Failed {
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Creates a dry-run result.
    #[must_use]
    pub fn dry_run(command: impl Into<String>) -> Self {
        Self::DryRun {
            command: command.into(),
        }
    }

    /// Returns true if the stage exited zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Returns true if the stage failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns the reported artifact of a successful run.
    #[must_use]
    pub fn artifact(&self) -> Option<&str> {
        match self {
            Self::Succeeded { artifact } => Some(artifact),
            Self::Failed { .. } | Self::DryRun { .. } => None,
        }
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded { artifact } if artifact.is_empty() => {
                write!(f, "succeeded (no artifact)")
            }
            Self::Succeeded { artifact } => write!(f, "succeeded: {artifact}"),
            Self::Failed { exit_code: Some(code), .. } => write!(f, "failed with exit code {code}"),
            Self::Failed { exit_code: None, .. } => write!(f, "failed without exit code"),
            Self::DryRun { command } => write!(f, "dry run: {command}"),
        }
    }
}
