//! Sequential batch driver with heartbeat reporting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn, Instrument};

use super::ItemRunner;
use crate::errors::RouterError;
use crate::events::SharedEventSink;
use crate::utils::{format_elapsed, generate_uuid};

/// How often a running item is checked for heartbeat purposes.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Batch run options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Forward dry-run to every item.
    pub dry_run: bool,
    /// Stop at the first non-zero item exit code.
    pub stop_on_error: bool,
    /// Interval between heartbeat lines for a long-running item.
    pub heartbeat: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            stop_on_error: false,
            heartbeat: Duration::from_secs(60),
        }
    }
}

impl BatchOptions {
    /// Sets dry-run forwarding.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets stop-on-error.
    #[must_use]
    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }
}

/// Exit status of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    /// The URL.
    pub url: String,
    /// Child exit code.
    pub exit_code: i32,
    /// Wall time in whole seconds.
    pub elapsed_secs: u64,
}

impl ItemResult {
    /// Returns true if the item exited zero.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Number of URLs in the list.
    pub total: usize,
    /// Results for the items that ran, in order.
    pub results: Vec<ItemResult>,
    /// Number of items that exited non-zero.
    pub failure_count: usize,
    /// Whether stop-on-error cut the batch short.
    pub stopped_early: bool,
    /// Exit code for the batch process.
    pub exit_code: i32,
}

impl BatchSummary {
    fn new(total: usize) -> Self {
        Self {
            total,
            results: Vec::with_capacity(total),
            failure_count: 0,
            stopped_early: false,
            exit_code: 0,
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} items ran, {} failed",
            self.results.len(),
            self.total,
            self.failure_count
        )?;
        if self.stopped_early {
            write!(f, " (stopped on error)")?;
        }
        Ok(())
    }
}

/// Runs a list of URLs one at a time through an [`ItemRunner`].
pub struct BatchDriver {
    runner: Arc<dyn ItemRunner>,
    events: SharedEventSink,
    options: BatchOptions,
}

impl fmt::Debug for BatchDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchDriver")
            .field("runner", &self.runner)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BatchDriver {
    /// Creates a new batch driver.
    #[must_use]
    pub fn new(runner: Arc<dyn ItemRunner>, events: SharedEventSink, options: BatchOptions) -> Self {
        Self {
            runner,
            events,
            options,
        }
    }

    /// Runs every URL in order.
    ///
    /// Item failures are counted, not returned as errors. The summary's
    /// exit code is 0 only if every item that ran exited 0; with
    /// stop-on-error it is the first failing item's code.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the list is empty or the heartbeat interval
    /// is zero. Nothing is spawned in either case.
    pub async fn run(&self, urls: &[String]) -> Result<BatchSummary, RouterError> {
        if urls.is_empty() {
            return Err(RouterError::usage("No valid URLs to process"));
        }
        if self.options.heartbeat.is_zero() {
            return Err(RouterError::usage("Heartbeat interval must be at least one second"));
        }

        let span = tracing::info_span!("batch", batch_id = %generate_uuid(), total = urls.len());
        self.run_all(urls).instrument(span).await
    }

    async fn run_all(&self, urls: &[String]) -> Result<BatchSummary, RouterError> {
        let total = urls.len();
        let mut summary = BatchSummary::new(total);
        info!(
            total,
            dry_run = self.options.dry_run,
            stop_on_error = self.options.stop_on_error,
            "Starting batch"
        );

        for (position, url) in urls.iter().enumerate() {
            let index = position + 1;
            let result = self.run_one(index, total, url).await;
            let exit_code = result.exit_code;
            summary.results.push(result);

            if exit_code != 0 {
                summary.failure_count += 1;
                if self.options.stop_on_error {
                    warn!(url = %url, exit_code, "Stopping batch on first failure");
                    summary.stopped_early = true;
                    summary.exit_code = exit_code;
                    break;
                }
            }
        }

        if !summary.stopped_early && summary.failure_count > 0 {
            summary.exit_code = 1;
        }

        self.events
            .emit(
                "batch.finished",
                Some(serde_json::json!({
                    "total": total,
                    "ran": summary.results.len(),
                    "failures": summary.failure_count,
                    "stopped_early": summary.stopped_early,
                    "exit_code": summary.exit_code,
                })),
            )
            .await;
        info!(%summary, "Batch finished");
        Ok(summary)
    }

    async fn run_one(&self, index: usize, total: usize, url: &str) -> ItemResult {
        self.events
            .emit(
                "batch.item_started",
                Some(serde_json::json!({"index": index, "total": total, "url": url})),
            )
            .await;

        let started = Instant::now();
        let mut next_heartbeat = self.options.heartbeat;
        let item = self.runner.run_item(url, self.options.dry_run);
        tokio::pin!(item);

        let exit_code = loop {
            tokio::select! {
                biased;
                code = &mut item => break code,
                () = tokio::time::sleep(POLL_INTERVAL) => {
                    let elapsed = started.elapsed();
                    if elapsed >= next_heartbeat {
                        while next_heartbeat <= elapsed {
                            next_heartbeat += self.options.heartbeat;
                        }
                        self.events
                            .emit(
                                "batch.heartbeat",
                                Some(serde_json::json!({
                                    "index": index,
                                    "total": total,
                                    "url": url,
                                    "elapsed_secs": elapsed.as_secs(),
                                    "elapsed": format_elapsed(elapsed),
                                })),
                            )
                            .await;
                    }
                }
            }
        };

        let elapsed = started.elapsed();
        self.events
            .emit(
                "batch.item_finished",
                Some(serde_json::json!({
                    "index": index,
                    "total": total,
                    "url": url,
                    "exit_code": exit_code,
                    "elapsed_secs": elapsed.as_secs(),
                    "elapsed": format_elapsed(elapsed),
                })),
            )
            .await;

        ItemResult {
            url: url.to_string(),
            exit_code,
            elapsed_secs: elapsed.as_secs(),
        }
    }
}
