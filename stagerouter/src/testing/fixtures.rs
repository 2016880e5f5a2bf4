//! Ready-made catalogs, records and driver harnesses.

use std::path::PathBuf;
use std::sync::Arc;

use super::ScriptedExecutor;
use crate::core::{MetadataRecord, StageState};
use crate::events::CollectingEventSink;
use crate::pipeline::{DownstreamPolicy, PipelineDriver, StageCatalog, StageSpec};
use crate::store::InMemoryRecordStore;

/// Stage names of the default video catalog.
pub const VIDEO_STAGES: [&str; 5] = ["download", "watermark", "clip", "caption", "screenshot"];

/// Executable path used for `stage` by [`catalog_of`].
#[must_use]
pub fn executable_for(stage: &str) -> PathBuf {
    PathBuf::from(format!("bin/{stage}"))
}

/// Builds a catalog whose executables are `bin/<name>`.
///
/// # Panics
///
/// Panics if `names` is not a valid catalog.
#[must_use]
pub fn catalog_of(names: &[&str]) -> StageCatalog {
    let stages = names
        .iter()
        .map(|name| StageSpec::new(*name, executable_for(name)))
        .collect();
    match StageCatalog::new(stages) {
        Ok(catalog) => catalog,
        Err(err) => panic!("invalid test catalog: {err}"),
    }
}

/// The five-stage video catalog.
#[must_use]
pub fn video_catalog() -> StageCatalog {
    catalog_of(&VIDEO_STAGES)
}

/// A record for `url` whose stages are given as (name, state) pairs.
#[must_use]
pub fn record_with(url: &str, stages: &[(&str, StageState)]) -> MetadataRecord {
    stages
        .iter()
        .fold(MetadataRecord::new(url), |record, (name, state)| {
            record.with_stage(*name, state.clone())
        })
}

/// Everything needed to drive one pipeline in memory.
#[derive(Debug)]
pub struct PipelineHarness {
    /// The record store shared with the driver.
    pub store: InMemoryRecordStore,
    /// The executor shared with the driver.
    pub executor: Arc<ScriptedExecutor>,
    /// The event sink shared with the driver.
    pub events: Arc<CollectingEventSink>,
    /// The driver under test.
    pub driver: PipelineDriver,
}

impl PipelineHarness {
    /// Builds a harness over `catalog` with the given executor.
    #[must_use]
    pub fn new(catalog: StageCatalog, executor: ScriptedExecutor) -> Self {
        Self::with_policy(catalog, executor, DownstreamPolicy::default())
    }

    /// Builds a harness with an explicit downstream policy.
    #[must_use]
    pub fn with_policy(
        catalog: StageCatalog,
        executor: ScriptedExecutor,
        policy: DownstreamPolicy,
    ) -> Self {
        let store = InMemoryRecordStore::new();
        let executor = Arc::new(executor);
        let events = Arc::new(CollectingEventSink::new());
        let driver = PipelineDriver::new(
            catalog,
            Arc::new(store.clone()),
            executor.clone(),
            events.clone(),
        )
        .with_policy(policy);

        Self {
            store,
            executor,
            events,
            driver,
        }
    }

    /// Seeds the store with a record at `mem/<n>`.
    #[must_use]
    pub fn seeded(self, record: MetadataRecord) -> Self {
        let location = format!("mem/{}", self.store.len());
        self.store.insert(location, record);
        self
    }
}
