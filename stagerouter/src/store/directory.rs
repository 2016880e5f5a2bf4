//! Directory-backed record store: one JSON file per work item.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::{RecordStore, StoredRecord};
use crate::core::MetadataRecord;
use crate::errors::{MalformedRecordError, RouterError};

/// Stores records as `*.json` files in a single directory.
///
/// File names carry no meaning; records are matched on their `url` field.
/// Files are visited in file-name order so the first match is stable.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    /// Creates a store over `dir`. The directory need not exist yet.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Reads and decodes one record file.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::MalformedRecord`] if the file cannot be read or
    /// is not a record.
    pub async fn read_record(path: &Path) -> Result<MetadataRecord, RouterError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MalformedRecordError::new(path, e.to_string()))?;
        MetadataRecord::from_json(&text)
            .map_err(|e| MalformedRecordError::new(path, e.to_string()).into())
    }

    async fn record_files(&self) -> Result<Vec<PathBuf>, RouterError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "Metadata directory does not exist");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_json = path.extension().is_some_and(|ext| ext == "json");
            if is_json && entry.file_type().await?.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn temp_path(location: &Path) -> PathBuf {
        let parent = location
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let filename = location
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("record.json");
        parent.join(format!(
            ".{}.{}.{}.tmp",
            filename,
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ))
    }

    async fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(contents).await?;
        file.sync_all().await
    }
}

#[async_trait]
impl RecordStore for DirectoryStore {
    async fn find(&self, url: &str) -> Result<Option<StoredRecord>, RouterError> {
        for path in self.record_files().await? {
            match Self::read_record(&path).await {
                Ok(record) if record.url == url => {
                    debug!(url, location = %path.display(), "Found metadata record");
                    return Ok(Some(StoredRecord::new(path, record)));
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "Skipping unreadable metadata file"),
            }
        }
        Ok(None)
    }

    async fn persist(&self, location: &Path, record: &MetadataRecord) -> Result<(), RouterError> {
        let text = record.to_pretty_json()?;
        let tmp = Self::temp_path(location);

        let written = match Self::write_synced(&tmp, text.as_bytes()).await {
            Ok(()) => tokio::fs::rename(&tmp, location).await,
            Err(err) => Err(err),
        };

        if let Err(err) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }

        debug!(location = %location.display(), "Persisted metadata record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageState;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_find_matches_url_field() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.json", r#"{"url":"u-other","stages":{}}"#);
        let expected = write(
            tmp.path(),
            "b.json",
            r#"{"url":"u1","stages":{"download":"/tmp/a.mp4"}}"#,
        );

        let store = DirectoryStore::new(tmp.path());
        let found = store.find("u1").await.unwrap().unwrap();

        assert_eq!(found.location, expected);
        assert_eq!(found.record.stage("download"), StageState::completed("/tmp/a.mp4"));
    }

    #[tokio::test]
    async fn test_find_first_match_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "2.json", r#"{"url":"dup","title":"second"}"#);
        let first = write(tmp.path(), "1.json", r#"{"url":"dup","title":"first"}"#);

        let found = DirectoryStore::new(tmp.path()).find("dup").await.unwrap().unwrap();
        assert_eq!(found.location, first);
    }

    #[tokio::test]
    async fn test_find_skips_malformed_and_non_json_files() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "0.json", "{ not json");
        write(tmp.path(), "1.json", r#"["an", "array"]"#);
        write(tmp.path(), "2.txt", r#"{"url":"u1"}"#);
        let good = write(tmp.path(), "3.json", r#"{"url":"u1"}"#);

        let found = DirectoryStore::new(tmp.path()).find("u1").await.unwrap().unwrap();
        assert_eq!(found.location, good);
    }

    #[tokio::test]
    async fn test_find_tolerates_odd_stage_values_and_legacy_maps() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "a.json",
            r#"{"url":"u1","stages":{"download":"/tmp/a.mp4"},"tasks":{"clip":true}}"#,
        );
        write(
            tmp.path(),
            "b.json",
            r#"{"url":"u2","stages":{"download":"/tmp/b.mp4","legacy_upload":3}}"#,
        );
        let store = DirectoryStore::new(tmp.path());

        let first = store.find("u1").await.unwrap().unwrap();
        assert_eq!(first.record.stage("download"), StageState::completed("/tmp/a.mp4"));
        assert_eq!(first.record.stage("clip"), StageState::Requested);

        let second = store.find("u2").await.unwrap().unwrap();
        assert_eq!(second.location, tmp.path().join("b.json"));
        assert_eq!(second.record.stage("legacy_upload"), StageState::Skip);
    }

    #[tokio::test]
    async fn test_find_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.json", r#"{"url":"u1"}"#);
        let store = DirectoryStore::new(tmp.path());

        assert!(store.find("u2").await.unwrap().is_none());
        assert!(store.find("U1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(tmp.path().join("missing"));
        assert!(store.find("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persist_replaces_contents_atomically() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(
            tmp.path(),
            "rec.json",
            r#"{"url":"u1","title":"t","stages":{"watermark":true}}"#,
        );
        let store = DirectoryStore::new(tmp.path());

        let mut found = store.find("u1").await.unwrap().unwrap();
        found.record.set_stage("watermark", StageState::completed("/tmp/a_wm.mp4"));
        store.persist(&found.location, &found.record).await.unwrap();

        let reread = DirectoryStore::read_record(&path).await.unwrap();
        assert_eq!(reread, found.record);
        assert_eq!(reread.extra.get("title"), Some(&serde_json::json!("t")));

        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("rec.json")]);
    }

    #[tokio::test]
    async fn test_persist_into_missing_directory_fails_cleanly() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(tmp.path());
        let location = tmp.path().join("gone").join("rec.json");

        let result = store.persist(&location, &MetadataRecord::new("u1")).await;
        assert!(matches!(result, Err(RouterError::Io(_))));
    }

    #[tokio::test]
    async fn test_read_record_reports_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "bad.json", r#"{"url": 5}"#);

        let err = DirectoryStore::read_record(&path).await.unwrap_err();
        assert!(matches!(err, RouterError::MalformedRecord(_)));
    }
}
