//! Testing utilities for stagerouter pipelines.
//!
//! This module provides:
//! - Scripted executors and batch item runners
//! - Catalog and record fixtures
//! - Assertions over run summaries

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_invoked, assert_nothing_invoked, assert_stage_status};
pub use fixtures::{
    PipelineHarness, VIDEO_STAGES, catalog_of, executable_for, record_with, video_catalog,
};
pub use mocks::{ScriptedExecutor, ScriptedItemRunner};
