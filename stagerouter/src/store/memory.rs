//! In-memory record store.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{RecordStore, StoredRecord};
use crate::core::MetadataRecord;
use crate::errors::RouterError;

/// Keeps records in insertion order behind a mutex.
///
/// Locations are opaque keys. Cloning shares the same underlying records,
/// which lets a test executor "bootstrap" a record the driver then finds.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    entries: Arc<Mutex<Vec<StoredRecord>>>,
    persist_count: Arc<Mutex<usize>>,
}

impl InMemoryRecordStore {
    /// Creates a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record at `location`.
    pub fn insert(&self, location: impl Into<PathBuf>, record: MetadataRecord) {
        let location = location.into();
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|e| e.location == location) {
            Some(existing) => existing.record = record,
            None => entries.push(StoredRecord::new(location, record)),
        }
    }

    /// Returns the record stored at `location`.
    #[must_use]
    pub fn get(&self, location: &Path) -> Option<MetadataRecord> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.location == location)
            .map(|e| e.record.clone())
    }

    /// Number of successful `persist` calls.
    #[must_use]
    pub fn persist_count(&self) -> usize {
        *self.persist_count.lock()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find(&self, url: &str) -> Result<Option<StoredRecord>, RouterError> {
        Ok(self
            .entries
            .lock()
            .iter()
            .find(|e| e.record.url == url)
            .cloned())
    }

    async fn persist(&self, location: &Path, record: &MetadataRecord) -> Result<(), RouterError> {
        self.insert(location, record.clone());
        *self.persist_count.lock() += 1;
        Ok(())
    }
}
