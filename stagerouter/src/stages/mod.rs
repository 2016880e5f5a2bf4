//! Stage executors.
//!
//! A stage's real work happens in an external executable. Executors turn
//! one invocation into an [`ExecutionResult`]; they never return an error,
//! so the pipeline driver decides what a failure means.

mod process;
mod result;

pub use process::{last_non_blank_line, ProcessExecutor};
pub use result::ExecutionResult;

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;

/// Trait for stage executors.
#[async_trait]
pub trait StageExecutor: Send + Sync + Debug {
    /// Runs `executable` with `input` as its only argument.
    ///
    /// # Arguments
    ///
    /// * `executable` - Path of the stage executable
    /// * `input` - The work item URL or the previous stage's artifact
    ///
    /// # Returns
    ///
    /// Success with the reported artifact, failure with captured stderr, or
    /// a dry-run description.
    async fn run(&self, executable: &Path, input: &str) -> ExecutionResult;

    /// Returns true if this executor never spawns or writes anything.
    fn is_dry_run(&self) -> bool {
        false
    }
}
