//! Metadata store: discovery and persistence of one record per work item.
//!
//! Records are found by URL through a linear content scan; there is no
//! index, and the first match wins. A URL with no record is a normal
//! outcome meaning the work item has never been bootstrapped.

mod directory;
mod memory;

pub use directory::DirectoryStore;
pub use memory::InMemoryRecordStore;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::core::MetadataRecord;
use crate::errors::RouterError;

/// A record together with where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Where to write the record back.
    pub location: PathBuf,
    /// The decoded record.
    pub record: MetadataRecord,
}

impl StoredRecord {
    /// Creates a new stored record.
    #[must_use]
    pub fn new(location: impl Into<PathBuf>, record: MetadataRecord) -> Self {
        Self {
            location: location.into(),
            record,
        }
    }
}

/// Storage backend for metadata records.
///
/// The pipeline driver is the only writer of a record during its run; no
/// locking is performed here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Finds the first record whose `url` equals `url` exactly.
    ///
    /// Unparseable entries are skipped with a warning. `Ok(None)` means no
    /// record exists yet.
    async fn find(&self, url: &str) -> Result<Option<StoredRecord>, RouterError>;

    /// Replaces the record at `location`.
    async fn persist(&self, location: &Path, record: &MetadataRecord) -> Result<(), RouterError>;
}
