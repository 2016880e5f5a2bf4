//! Router configuration.
//!
//! Loaded from a JSON file. Every field has a default, so an absent file
//! yields a usable configuration. Relative executable paths are resolved by
//! the OS against the working directory at spawn time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::errors::{PipelineValidationError, RouterError};
use crate::pipeline::{DownstreamPolicy, StageCatalog, StageSpec};

/// Path probed when no configuration file is given explicitly.
pub const DEFAULT_CONFIG_PATH: &str = "conf/router.json";

/// Configuration shared by the pipeline and batch drivers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Directory holding one metadata record per work item.
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: PathBuf,
    /// Ordered stage catalog.
    #[serde(default = "default_stages")]
    pub stages: Vec<StageSpec>,
    /// Behavior of later stages after a failure in the same run.
    #[serde(default)]
    pub downstream_policy: DownstreamPolicy,
    /// Seconds between batch heartbeat lines.
    #[serde(default = "default_heartbeat_seconds")]
    pub heartbeat_seconds: u64,
}

fn default_metadata_dir() -> PathBuf {
    PathBuf::from("./metadata")
}

fn default_stages() -> Vec<StageSpec> {
    ["download", "watermark", "clip", "caption", "screenshot"]
        .into_iter()
        .map(|name| StageSpec::new(name, Path::new("bin").join(name)))
        .collect()
}

fn default_heartbeat_seconds() -> u64 {
    60
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            metadata_dir: default_metadata_dir(),
            stages: default_stages(),
            downstream_policy: DownstreamPolicy::default(),
            heartbeat_seconds: default_heartbeat_seconds(),
        }
    }
}

impl RouterConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the configuration.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_PATH`]
    /// is used if present, otherwise defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or
    /// fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, RouterError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => {
                debug!("No configuration file found, using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses a configuration file without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, RouterError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineValidationError::new(format!(
                "Cannot read configuration {}: {e}",
                path.display()
            ))
        })?;
        let config = serde_json::from_str::<Self>(&text).map_err(|e| {
            PipelineValidationError::new(format!("Invalid configuration {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_seconds(mut self, seconds: u64) -> Self {
        self.heartbeat_seconds = seconds;
        self
    }

    /// Checks the catalog and heartbeat interval.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog is invalid or the heartbeat is zero.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        self.catalog()?;
        if self.heartbeat_seconds == 0 {
            return Err(PipelineValidationError::new(
                "heartbeat_seconds must be at least 1",
            ));
        }
        Ok(())
    }

    /// Builds the stage catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage list is not a valid catalog.
    pub fn catalog(&self) -> Result<StageCatalog, PipelineValidationError> {
        StageCatalog::new(self.stages.clone())
    }

    /// Heartbeat interval as a duration.
    #[must_use]
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_seconds)
    }
}
