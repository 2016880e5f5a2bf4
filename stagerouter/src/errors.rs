//! Error types for the stagerouter drivers.
//!
//! Only usage, configuration, bootstrap and store-level failures surface as
//! `Err`. Stage failures, missing inputs and malformed records are folded into
//! outcomes and log events instead of being propagated.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for stagerouter operations.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Malformed command-line input.
    #[error("Usage error: {0}")]
    Usage(String),

    /// The configuration or stage catalog is invalid.
    #[error("{0}")]
    Config(#[from] PipelineValidationError),

    /// The mandatory first-run stage failed or left no record behind.
    #[error("{0}")]
    Bootstrap(#[from] BootstrapError),

    /// A metadata file could not be parsed.
    #[error("{0}")]
    MalformedRecord(#[from] MalformedRecordError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for RouterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl RouterError {
    /// Creates a usage error.
    #[must_use]
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }
}

/// Error raised when configuration or catalog validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
}

impl PipelineValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}

/// Why a bootstrap attempt was fatal for its work item.
#[derive(Debug, Clone, Error)]
pub enum BootstrapError {
    /// The first stage's executable reported failure.
    #[error("Bootstrap stage '{stage}' failed for {url} (exit {}): {stderr}", .exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    StageFailed {
        /// The bootstrap stage name.
        stage: String,
        /// The work item URL.
        url: String,
        /// Captured standard error.
        stderr: String,
        /// Exit code, absent when killed by a signal or never spawned.
        exit_code: Option<i32>,
    },

    /// The first stage succeeded but no record for the URL exists afterwards.
    #[error("No metadata record found for {url} after bootstrap stage '{stage}'")]
    RecordMissing {
        /// The bootstrap stage name.
        stage: String,
        /// The work item URL.
        url: String,
    },
}

/// A metadata file that could not be read as a record.
#[derive(Debug, Clone, Error)]
#[error("Failed to parse {}: {reason}", .path.display())]
pub struct MalformedRecordError {
    /// The offending file.
    pub path: PathBuf,
    /// Parser or I/O message.
    pub reason: String,
}

impl MalformedRecordError {
    /// Creates a new malformed record error.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_with_stages() {
        let err = PipelineValidationError::new("Duplicate stage name: clip")
            .with_stages(vec!["clip".to_string()]);

        assert_eq!(err.to_string(), "Duplicate stage name: clip");
        assert_eq!(err.stages, vec!["clip".to_string()]);
    }

    #[test]
    fn test_bootstrap_error_display() {
        let err = BootstrapError::StageFailed {
            stage: "download".to_string(),
            url: "https://example.com/v".to_string(),
            stderr: "403 Forbidden".to_string(),
            exit_code: Some(2),
        };
        let text = err.to_string();
        assert!(text.contains("download"));
        assert!(text.contains("exit 2"));
        assert!(text.contains("403 Forbidden"));

        let signalled = BootstrapError::StageFailed {
            stage: "download".to_string(),
            url: "u".to_string(),
            stderr: String::new(),
            exit_code: None,
        };
        assert!(signalled.to_string().contains("exit none"));
    }

    #[test]
    fn test_router_error_conversions() {
        let err: RouterError = BootstrapError::RecordMissing {
            stage: "download".to_string(),
            url: "u1".to_string(),
        }
        .into();
        assert!(matches!(err, RouterError::Bootstrap(_)));

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: RouterError = json_err.into();
        assert!(matches!(err, RouterError::Serialization(_)));
    }

    #[test]
    fn test_malformed_record_display() {
        let err = MalformedRecordError::new("/tmp/meta/a.json", "expected value");
        assert_eq!(err.to_string(), "Failed to parse /tmp/meta/a.json: expected value");
    }
}
