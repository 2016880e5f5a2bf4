//! Per-run results reported by the pipeline driver.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::FailureRecord;
use crate::core::{MetadataRecord, StageStatus};
use crate::utils::{generate_uuid, iso_timestamp};

/// What happened to one stage during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutcome {
    /// Stage name.
    pub stage: String,
    /// Outcome.
    pub status: StageStatus,
    /// Argument the executable was (or would have been) given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Artifact adopted or produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    /// Failure text, block reason or dry-run description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Exit code of a failed invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Wall time of the invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Whether this was the bootstrap invocation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bootstrap: bool,
}

impl StageOutcome {
    /// Creates an outcome with no details.
    #[must_use]
    pub fn new(stage: impl Into<String>, status: StageStatus) -> Self {
        Self {
            stage: stage.into(),
            status,
            input: None,
            artifact: None,
            detail: None,
            exit_code: None,
            duration_ms: None,
            bootstrap: false,
        }
    }

    /// Sets the input.
    #[must_use]
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Sets the artifact.
    #[must_use]
    pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifact = Some(artifact.into());
        self
    }

    /// Sets the detail text.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Sets the exit code.
    #[must_use]
    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Marks the outcome as the bootstrap invocation.
    #[must_use]
    pub fn as_bootstrap(mut self) -> Self {
        self.bootstrap = true;
        self
    }

    /// Event payload for this outcome.
    #[must_use]
    pub fn to_event_data(&self, url: &str) -> serde_json::Value {
        let mut data = serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}));
        if let Some(map) = data.as_object_mut() {
            map.insert("url".to_string(), serde_json::json!(url));
        }
        data
    }
}

/// Result of one pipeline run for one work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// The work item URL.
    pub url: String,
    /// When the run started (ISO 8601).
    pub started_at: String,
    /// Whether nothing was spawned or written.
    pub dry_run: bool,
    /// Whether the record was created by a bootstrap in this run.
    pub bootstrapped: bool,
    /// Where the record lives, once known.
    pub location: Option<PathBuf>,
    /// Outcomes in catalog order.
    pub outcomes: Vec<StageOutcome>,
    /// Last known good artifact after the loop.
    pub final_artifact: String,
    /// Stage failures seen in this run.
    pub failures: Vec<FailureRecord>,
    /// The record as persisted (or as it would have been, in dry-run).
    pub record: Option<MetadataRecord>,
}

impl RunSummary {
    /// Starts a summary for a new run.
    #[must_use]
    pub fn new(url: impl Into<String>, dry_run: bool) -> Self {
        Self {
            run_id: generate_uuid(),
            url: url.into(),
            started_at: iso_timestamp(),
            dry_run,
            bootstrapped: false,
            location: None,
            outcomes: Vec::new(),
            final_artifact: String::new(),
            failures: Vec::new(),
            record: None,
        }
    }

    /// Returns the outcome recorded for a stage.
    #[must_use]
    pub fn outcome(&self, stage: &str) -> Option<&StageOutcome> {
        self.outcomes.iter().find(|o| o.stage == stage)
    }

    /// Names of stages whose executable was spawned, in order.
    #[must_use]
    pub fn invoked_stages(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.status.was_invoked())
            .map(|o| o.stage.as_str())
            .collect()
    }

    /// Returns true if any stage failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Number of outcomes with the given status.
    #[must_use]
    pub fn count(&self, status: StageStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_event_data() {
        let outcome = StageOutcome::new("watermark", StageStatus::Succeeded)
            .with_input("/tmp/a.mp4")
            .with_artifact("/tmp/a_wm.mp4");

        let data = outcome.to_event_data("u1");
        assert_eq!(data["stage"], "watermark");
        assert_eq!(data["status"], "succeeded");
        assert_eq!(data["url"], "u1");
        assert_eq!(data["artifact"], "/tmp/a_wm.mp4");
        assert!(data.get("detail").is_none());
        assert!(data.get("bootstrap").is_none());
    }

    #[test]
    fn test_summary_queries() {
        let mut summary = RunSummary::new("u1", false);
        summary.outcomes.push(StageOutcome::new("download", StageStatus::CompletedPreviously));
        summary.outcomes.push(StageOutcome::new("watermark", StageStatus::Failed));
        summary.outcomes.push(StageOutcome::new("clip", StageStatus::Succeeded));
        summary
            .failures
            .push(FailureRecord::new("watermark", "boom", Some(1)));

        assert_eq!(summary.invoked_stages(), vec!["watermark", "clip"]);
        assert_eq!(summary.count(StageStatus::Failed), 1);
        assert!(summary.has_failures());
        assert_eq!(
            summary.outcome("clip").map(|o| o.status),
            Some(StageStatus::Succeeded)
        );
        assert!(summary.outcome("caption").is_none());
    }
}
