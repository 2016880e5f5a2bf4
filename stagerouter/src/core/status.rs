//! Outcome of evaluating one stage during a run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to a stage when the driver reached it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Already completed in an earlier run; its artifact was adopted.
    CompletedPreviously,
    /// Not requested for this work item.
    Skipped,
    /// Ran and exited zero.
    Succeeded,
    /// Ran and exited non-zero, or could not be spawned.
    Failed,
    /// Requested, but no upstream artifact exists to feed it.
    MissingInput,
    /// Requested, but held back because an earlier stage failed this run.
    Blocked,
    /// Would have run; dry-run mode.
    DryRun,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompletedPreviously => write!(f, "completed_previously"),
            Self::Skipped => write!(f, "skipped"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::MissingInput => write!(f, "missing_input"),
            Self::Blocked => write!(f, "blocked"),
            Self::DryRun => write!(f, "dry_run"),
        }
    }
}

impl StageStatus {
    /// Event name emitted for this outcome.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::CompletedPreviously => "stage.completed_previously",
            Self::Skipped => "stage.skipped",
            Self::Succeeded => "stage.succeeded",
            Self::Failed => "stage.failed",
            Self::MissingInput => "stage.missing_input",
            Self::Blocked => "stage.blocked",
            Self::DryRun => "stage.dry_run",
        }
    }

    /// Returns true if the stage's executable was actually spawned.
    #[must_use]
    pub fn was_invoked(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}
