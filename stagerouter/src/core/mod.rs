//! Core domain model types for stagerouter.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Per-stage persisted state
//! - The metadata record
//! - Per-stage run outcomes

mod record;
mod state;
mod status;

pub use record::{MetadataRecord, StageMap};
pub use state::StageState;
pub use status::StageStatus;
