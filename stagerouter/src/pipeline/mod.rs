//! Pipeline definition and execution.
//!
//! This module provides:
//! - The ordered stage catalog
//! - The per-item pipeline driver
//! - Downstream failure policy
//! - Run summaries

mod driver;
mod failure_tolerance;
mod spec;
mod summary;


pub use driver::PipelineDriver;
pub use failure_tolerance::{DownstreamPolicy, FailureCollector, FailureRecord};
pub use spec::{StageCatalog, StageSpec};
pub use summary::{RunSummary, StageOutcome};
