//! The stage catalog: the fixed, ordered list of stages every work item
//! moves through.

use crate::errors::PipelineValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Specification for a single stage in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageSpec {
    /// The unique name of the stage, also its key in the record's stage map.
    pub name: String,
    /// The executable invoked as `<executable> <input>`.
    pub executable: PathBuf,
}

impl StageSpec {
    /// Creates a new stage specification.
    #[must_use]
    pub fn new(name: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
        }
    }

    /// Validates the stage specification.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or executable is blank.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new(
                "Stage name cannot be empty or whitespace-only",
            ));
        }
        if self.executable.as_os_str().is_empty() {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' has no executable",
                self.name
            ))
            .with_stages(vec![self.name.clone()]));
        }
        Ok(())
    }
}

/// Ordered stages shared by all work items.
///
/// The first entry receives the work item's URL; each later entry receives
/// the artifact of the stages before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCatalog {
    stages: Vec<StageSpec>,
}

impl StageCatalog {
    /// Creates a validated catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog is empty, a stage is invalid, or a
    /// stage name appears twice.
    pub fn new(stages: Vec<StageSpec>) -> Result<Self, PipelineValidationError> {
        if stages.is_empty() {
            return Err(PipelineValidationError::new(
                "Stage catalog must contain at least one stage",
            ));
        }

        let mut seen = HashSet::new();
        for stage in &stages {
            stage.validate()?;
            if !seen.insert(stage.name.as_str()) {
                return Err(PipelineValidationError::new(format!(
                    "Duplicate stage name in catalog: {}",
                    stage.name
                ))
                .with_stages(vec![stage.name.clone()]));
            }
        }

        Ok(Self { stages })
    }

    /// Builds a catalog from `(name, executable)` pairs.
    ///
    /// # Errors
    ///
    /// Same as [`StageCatalog::new`].
    pub fn from_pairs<N, E>(
        pairs: impl IntoIterator<Item = (N, E)>,
    ) -> Result<Self, PipelineValidationError>
    where
        N: Into<String>,
        E: Into<PathBuf>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, exe)| StageSpec::new(name, exe))
                .collect(),
        )
    }

    /// The stage that bootstraps new work items.
    #[must_use]
    pub fn first(&self) -> &StageSpec {
        &self.stages[0]
    }

    /// Iterates stages in order.
    pub fn iter(&self) -> std::slice::Iter<'_, StageSpec> {
        self.stages.iter()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false; a catalog cannot be empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns true if a stage with this name is in the catalog.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.stages.iter().any(|s| s.name == name)
    }

    /// Stage names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a StageCatalog {
    type Item = &'a StageSpec;
    type IntoIter = std::slice::Iter<'a, StageSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_creation() {
        let catalog =
            StageCatalog::from_pairs([("download", "bin/download"), ("clip", "bin/clip")]).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.first().name, "download");
        assert_eq!(catalog.names(), vec!["download", "clip"]);
        assert!(catalog.contains("download"));
        assert!(!catalog.contains("caption"));
    }

    #[test]
    fn test_catalog_empty() {
        assert!(StageCatalog::new(Vec::new()).is_err());
    }

    #[test]
    fn test_catalog_duplicate_names() {
        let err = StageCatalog::from_pairs([("clip", "a"), ("clip", "b")]).unwrap_err();
        assert_eq!(err.stages, vec!["clip".to_string()]);
    }

    #[test]
    fn test_stage_spec_blank_fields() {
        assert!(StageSpec::new("  ", "bin/x").validate().is_err());
        assert!(StageSpec::new("clip", "").validate().is_err());
        assert!(StageSpec::new("clip", "bin/clip").validate().is_ok());
    }

    #[test]
    fn test_stage_spec_deserialize() {
        let spec: StageSpec =
            serde_json::from_str(r#"{"name":"clip","executable":"/opt/bin/clip"}"#).unwrap();
        assert_eq!(spec, StageSpec::new("clip", "/opt/bin/clip"));
        assert!(serde_json::from_str::<StageSpec>(r#"{"name":"clip","exe":"x"}"#).is_err());
    }
}
