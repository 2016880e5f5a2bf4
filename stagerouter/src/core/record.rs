//! The persisted metadata record for one work item.

use super::StageState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Stage states keyed by stage name.
pub type StageMap = BTreeMap<String, StageState>;

/// One work item's persisted progress.
///
/// Besides `url` and the stage map, records carry descriptive fields written
/// by the external stages (title, uploader, paths, ...). Those are kept in
/// [`MetadataRecord::extra`] and written back untouched.
///
/// Older records keep their stages under `default_tasks` or `tasks`. All
/// three maps are merged on read, `stages` taking precedence, and written
/// back as `stages`. A stage value that is not a boolean, `null` or a string
/// is read as [`StageState::Skip`] so the rest of the record stays usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRecord")]
pub struct MetadataRecord {
    /// Source URL identifying the work item. Never rewritten once created.
    pub url: String,

    /// Per-stage state.
    pub stages: StageMap,

    /// Every other top-level field.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct RawRecord {
    url: String,
    #[serde(flatten)]
    fields: serde_json::Map<String, Value>,
}

/// Keys holding a stage map, lowest precedence first.
const STAGE_MAP_KEYS: [&str; 3] = ["default_tasks", "tasks", "stages"];

impl From<RawRecord> for MetadataRecord {
    fn from(raw: RawRecord) -> Self {
        let RawRecord { url, mut fields } = raw;
        let mut stages = StageMap::new();

        for key in STAGE_MAP_KEYS {
            match fields.remove(key) {
                None | Some(Value::Null) => {}
                Some(Value::Object(map)) => {
                    for (name, value) in map {
                        let state = StageState::from_value(&value).unwrap_or_else(|| {
                            warn!(
                                url = %url,
                                stage = %name,
                                value = %value,
                                "Stage value is neither a flag nor a path, treating it as skipped"
                            );
                            StageState::Skip
                        });
                        stages.insert(name, state);
                    }
                }
                Some(other) => {
                    warn!(url = %url, key, value = %other, "Stage map is not an object, ignoring it");
                }
            }
        }

        Self {
            url,
            stages,
            extra: fields,
        }
    }
}

impl MetadataRecord {
    /// Creates a record with no stages and no descriptive fields.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stages: StageMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Sets one stage's state.
    #[must_use]
    pub fn with_stage(mut self, name: impl Into<String>, state: StageState) -> Self {
        self.stages.insert(name.into(), state);
        self
    }

    /// Adds a descriptive field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Returns a stage's state; stages missing from the map are skipped.
    #[must_use]
    pub fn stage(&self, name: &str) -> StageState {
        self.stages.get(name).cloned().unwrap_or_default()
    }

    /// Records a stage's state.
    pub fn set_stage(&mut self, name: impl Into<String>, state: StageState) {
        self.stages.insert(name.into(), state);
    }

    /// Parses a record from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Renders the record as indented JSON with a trailing newline.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_example_record() {
        let record = MetadataRecord::from_json(
            r#"{"url":"u1","stages":{"download":"/tmp/a.mp4","watermark":true,"clip":false}}"#,
        )
        .unwrap();

        assert_eq!(record.url, "u1");
        assert_eq!(record.stage("download"), StageState::completed("/tmp/a.mp4"));
        assert_eq!(record.stage("watermark"), StageState::Requested);
        assert_eq!(record.stage("clip"), StageState::Skip);
        assert_eq!(record.stage("caption"), StageState::Skip);
    }

    #[test]
    fn test_legacy_stage_keys() {
        let record = MetadataRecord::from_json(
            r#"{"url":"u2","default_tasks":{"perform_download":true}}"#,
        )
        .unwrap();
        assert_eq!(record.stage("perform_download"), StageState::Requested);

        let record =
            MetadataRecord::from_json(r#"{"url":"u3","tasks":{"make_clips":"/c.mp4"}}"#).unwrap();
        assert_eq!(record.stage("make_clips"), StageState::completed("/c.mp4"));
    }

    #[test]
    fn test_descriptive_fields_survive_round_trip() {
        let text = r#"{
            "url": "u1",
            "title": "Sunset",
            "uploader": "someone",
            "stages": {"download": "/tmp/a.mp4", "clip": null}
        }"#;
        let record = MetadataRecord::from_json(text).unwrap();
        assert_eq!(record.extra.get("title"), Some(&serde_json::json!("Sunset")));

        let written: serde_json::Value =
            serde_json::from_str(&record.to_pretty_json().unwrap()).unwrap();
        assert_eq!(
            written,
            serde_json::json!({
                "url": "u1",
                "title": "Sunset",
                "uploader": "someone",
                "stages": {"download": "/tmp/a.mp4", "clip": false}
            })
        );
    }

    #[test]
    fn test_missing_url_is_rejected() {
        assert!(MetadataRecord::from_json(r#"{"stages":{}}"#).is_err());
        assert!(MetadataRecord::from_json(r#"{"url":7,"stages":{}}"#).is_err());
        assert!(MetadataRecord::from_json("[]").is_err());
    }

    #[test]
    fn test_untyped_stage_value_reads_as_skip() {
        let record = MetadataRecord::from_json(
            r#"{"url":"u2","stages":{"download":"/tmp/b.mp4","legacy_upload":3,"clip":[true]}}"#,
        )
        .unwrap();

        assert_eq!(record.stage("download"), StageState::completed("/tmp/b.mp4"));
        assert_eq!(record.stage("legacy_upload"), StageState::Skip);
        assert_eq!(record.stage("clip"), StageState::Skip);
    }

    #[test]
    fn test_stages_merged_with_legacy_keys() {
        let record = MetadataRecord::from_json(
            r#"{
                "url": "u1",
                "default_tasks": {"caption": true, "clip": false},
                "tasks": {"clip": true, "download": true},
                "stages": {"download": "/tmp/a.mp4"}
            }"#,
        )
        .unwrap();

        assert_eq!(record.stage("download"), StageState::completed("/tmp/a.mp4"));
        assert_eq!(record.stage("clip"), StageState::Requested);
        assert_eq!(record.stage("caption"), StageState::Requested);
        assert!(record.extra.is_empty());

        let written: serde_json::Value =
            serde_json::from_str(&record.to_pretty_json().unwrap()).unwrap();
        assert_eq!(
            written,
            serde_json::json!({
                "url": "u1",
                "stages": {"caption": true, "clip": true, "download": "/tmp/a.mp4"}
            })
        );
    }

    #[test]
    fn test_non_object_stage_map_is_ignored() {
        let record =
            MetadataRecord::from_json(r#"{"url":"u4","stages":"oops","title":"t"}"#).unwrap();
        assert!(record.stages.is_empty());
        assert_eq!(record.extra.get("title"), Some(&serde_json::json!("t")));
    }

    #[test]
    fn test_set_stage() {
        let mut record = MetadataRecord::new("u").with_stage("clip", StageState::Requested);
        record.set_stage("clip", StageState::completed("/c.mp4"));
        assert_eq!(record.stage("clip").artifact(), Some("/c.mp4"));
        assert!(record.to_pretty_json().unwrap().ends_with('\n'));
    }
}
