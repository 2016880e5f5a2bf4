//! Batch driver: one pipeline run per URL, in sequence.
//!
//! Each item runs as an isolated child process so a crash in one item
//! cannot take the batch down. Only the child's exit code is observed.

mod driver;
mod runner;
mod urls;

pub use driver::{BatchDriver, BatchOptions, BatchSummary, ItemResult, POLL_INTERVAL};
pub use runner::{ItemRunner, ProcessItemRunner};
pub use urls::{load_url_list, parse_url_list};
