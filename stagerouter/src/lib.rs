//! # Stagerouter
//!
//! A resumable, idempotent pipeline-state machine over URL work items.
//!
//! Every work item has one metadata record mapping stage names to a state:
//! skip, requested, or completed with an artifact path. Stagerouter
//! provides:
//!
//! - **Metadata store**: find a record by URL and write it back atomically
//! - **Stage execution**: run external stage executables and read back the artifact
//! - **Pipeline driver**: walk the stage catalog once, running only what is requested
//! - **Batch driver**: process a list of URLs sequentially with heartbeats
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagerouter::prelude::*;
//! use std::sync::Arc;
//!
//! let config = RouterConfig::load(None)?;
//! let driver = PipelineDriver::new(
//!     config.catalog()?,
//!     Arc::new(DirectoryStore::new(&config.metadata_dir)),
//!     Arc::new(ProcessExecutor::new()),
//!     logging_sink(),
//! );
//!
//! let summary = driver.run("https://example.com/video/1").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod batch;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod stages;
pub mod store;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::batch::{
        BatchDriver, BatchOptions, BatchSummary, ItemRunner, ProcessItemRunner, load_url_list,
    };
    pub use crate::config::RouterConfig;
    pub use crate::core::{MetadataRecord, StageState, StageStatus};
    pub use crate::errors::{
        BootstrapError, MalformedRecordError, PipelineValidationError, RouterError,
    };
    pub use crate::events::{
        EventSink, LoggingEventSink, NoOpEventSink, SharedEventSink, logging_sink,
    };
    pub use crate::pipeline::{
        DownstreamPolicy, PipelineDriver, RunSummary, StageCatalog, StageOutcome, StageSpec,
    };
    pub use crate::stages::{ExecutionResult, ProcessExecutor, StageExecutor};
    pub use crate::store::{DirectoryStore, RecordStore};
    pub use crate::utils::{generate_uuid, iso_timestamp, Timestamp};
}
