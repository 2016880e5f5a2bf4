//! What later stages do after an earlier stage fails in the same run.
//!
//! A failed stage never aborts the run. The policy only decides whether
//! stages further down may still consume the last artifact that is known
//! to exist, which may predate the failure.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::iso_timestamp;

/// How requested stages behave downstream of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownstreamPolicy {
    /// Keep going with the last known good artifact (default).
    #[default]
    ContinueWithLastKnown,
    /// Hold every later requested stage until the failed one succeeds.
    BlockAfterFailure,
}

impl fmt::Display for DownstreamPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContinueWithLastKnown => write!(f, "continue_with_last_known"),
            Self::BlockAfterFailure => write!(f, "block_after_failure"),
        }
    }
}

/// Record of a stage failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Stage name.
    pub stage: String,
    /// Captured standard error, or the spawn error.
    pub error: String,
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// When the failure was observed (ISO 8601).
    pub timestamp: String,
}

impl FailureRecord {
    /// Creates a new failure record.
    #[must_use]
    pub fn new(stage: impl Into<String>, error: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            stage: stage.into(),
            error: error.into(),
            exit_code,
            timestamp: iso_timestamp(),
        }
    }
}

/// Collects failures during one run and applies the downstream policy.
#[derive(Debug)]
pub struct FailureCollector {
    /// Downstream policy.
    pub policy: DownstreamPolicy,
    failures: Vec<FailureRecord>,
}

impl FailureCollector {
    /// Creates a new failure collector.
    #[must_use]
    pub fn new(policy: DownstreamPolicy) -> Self {
        Self {
            policy,
            failures: Vec::new(),
        }
    }

    /// Records a stage failure.
    pub fn record_failure(&mut self, record: FailureRecord) {
        self.failures.push(record);
    }

    /// Returns the stage that blocks a later stage from running, if any.
    #[must_use]
    pub fn blocking_stage(&self) -> Option<&str> {
        match self.policy {
            DownstreamPolicy::ContinueWithLastKnown => None,
            DownstreamPolicy::BlockAfterFailure => self.failures.first().map(|f| f.stage.as_str()),
        }
    }

    /// Consumes the collector, returning its failures.
    #[must_use]
    pub fn into_failures(self) -> Vec<FailureRecord> {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downstream_policy_default() {
        assert_eq!(DownstreamPolicy::default(), DownstreamPolicy::ContinueWithLastKnown);
    }

    #[test]
    fn test_downstream_policy_serde() {
        let policy: DownstreamPolicy = serde_json::from_str(r#""block_after_failure""#).unwrap();
        assert_eq!(policy, DownstreamPolicy::BlockAfterFailure);
        assert_eq!(policy.to_string(), "block_after_failure");
    }

    #[test]
    fn test_failure_record_creation() {
        let record = FailureRecord::new("watermark", "font missing", Some(1));

        assert_eq!(record.stage, "watermark");
        assert_eq!(record.error, "font missing");
        assert_eq!(record.exit_code, Some(1));
        assert!(record.timestamp.contains('T'));
    }

    #[test]
    fn test_continue_with_last_known() {
        let mut collector = FailureCollector::new(DownstreamPolicy::ContinueWithLastKnown);
        collector.record_failure(FailureRecord::new("watermark", "error", Some(1)));

        assert_eq!(collector.blocking_stage(), None);
        assert_eq!(collector.into_failures().len(), 1);
    }

    #[test]
    fn test_block_after_failure() {
        let mut collector = FailureCollector::new(DownstreamPolicy::BlockAfterFailure);
        assert_eq!(collector.blocking_stage(), None);

        collector.record_failure(FailureRecord::new("watermark", "error", None));
        collector.record_failure(FailureRecord::new("clip", "error", None));

        assert_eq!(collector.blocking_stage(), Some("watermark"));
        assert_eq!(collector.into_failures().len(), 2);
    }
}
