//! Utility functions for run identifiers and timestamps.

pub mod timestamps;

pub use timestamps::{format_elapsed, format_iso8601, iso_timestamp, Timestamp};

use uuid::Uuid;

/// Generates a new UUID v4, used as a pipeline run id.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}
