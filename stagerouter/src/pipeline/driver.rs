//! Per-item pipeline driver.
//!
//! Loads (or bootstraps) the metadata record for one URL, walks the stage
//! catalog once in order, invokes every requested stage whose input is
//! available, and writes the record back. Running it twice in a row with no
//! external change invokes nothing the second time.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

use super::{
    DownstreamPolicy, FailureCollector, FailureRecord, RunSummary, StageCatalog, StageOutcome,
    StageSpec,
};
use crate::core::{MetadataRecord, StageState, StageStatus};
use crate::errors::{BootstrapError, RouterError};
use crate::events::SharedEventSink;
use crate::stages::{ExecutionResult, StageExecutor};
use crate::store::{RecordStore, StoredRecord};

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Mutable state threaded through one walk of the catalog.
struct RunState {
    record: MetadataRecord,
    current_artifact: String,
    failures: FailureCollector,
}

impl RunState {
    fn adopt(&mut self, artifact: &str) {
        if !artifact.is_empty() {
            self.current_artifact = artifact.to_string();
        }
    }
}

/// Drives one work item through the stage catalog.
pub struct PipelineDriver {
    catalog: StageCatalog,
    store: Arc<dyn RecordStore>,
    executor: Arc<dyn StageExecutor>,
    events: SharedEventSink,
    policy: DownstreamPolicy,
}

impl std::fmt::Debug for PipelineDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineDriver")
            .field("catalog", &self.catalog.names())
            .field("executor", &self.executor)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl PipelineDriver {
    /// Creates a driver with the default downstream policy.
    #[must_use]
    pub fn new(
        catalog: StageCatalog,
        store: Arc<dyn RecordStore>,
        executor: Arc<dyn StageExecutor>,
        events: SharedEventSink,
    ) -> Self {
        Self {
            catalog,
            store,
            executor,
            events,
            policy: DownstreamPolicy::default(),
        }
    }

    /// Sets the downstream policy.
    #[must_use]
    pub fn with_policy(mut self, policy: DownstreamPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns true if the executor never spawns or writes anything.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.executor.is_dry_run()
    }

    /// Runs the pipeline for `url`.
    ///
    /// Stage failures are reported in the summary, not as errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the bootstrap stage fails, if it succeeds
    /// without a record appearing, or if the record cannot be written back.
    pub async fn run(&self, url: &str) -> Result<RunSummary, RouterError> {
        let summary = RunSummary::new(url, self.is_dry_run());
        let span = tracing::info_span!("pipeline", run_id = %summary.run_id, url);
        self.run_inner(summary).instrument(span).await
    }

    async fn run_inner(&self, mut summary: RunSummary) -> Result<RunSummary, RouterError> {
        let url = summary.url.clone();

        let (stored, bootstrap_artifact) = match self.store.find(&url).await? {
            Some(stored) => (stored, None),
            None => match self.bootstrap(&url, &mut summary).await? {
                Some((stored, artifact)) => (stored, Some(artifact)),
                None => return Ok(summary),
            },
        };

        let StoredRecord { location, record } = stored;
        summary.location = Some(location.clone());
        self.warn_unknown_stages(&record);

        let mut state = RunState {
            record,
            current_artifact: String::new(),
            failures: FailureCollector::new(self.policy),
        };

        for (index, spec) in self.catalog.iter().enumerate() {
            if index == 0 {
                if let Some(artifact) = bootstrap_artifact.as_deref() {
                    Self::reconcile_bootstrap(spec, artifact, &mut state);
                    continue;
                }
            }

            let outcome = self.evaluate(index, spec, &url, &mut state).await;
            self.events
                .emit(outcome.status.event_type(), Some(outcome.to_event_data(&url)))
                .await;
            summary.outcomes.push(outcome);
        }

        summary.final_artifact = state.current_artifact;
        summary.failures = state.failures.into_failures();

        if summary.dry_run {
            info!(
                location = %location.display(),
                "Dry run, metadata record left unchanged"
            );
        } else {
            self.store.persist(&location, &state.record).await?;
            self.events
                .emit(
                    "pipeline.persisted",
                    Some(serde_json::json!({
                        "url": url,
                        "location": location.display().to_string(),
                        "failures": summary.failures.len(),
                    })),
                )
                .await;
        }

        info!(
            invoked = summary.invoked_stages().len(),
            failed = summary.failures.len(),
            final_artifact = %summary.final_artifact,
            "Pipeline run finished"
        );
        summary.record = Some(state.record);
        Ok(summary)
    }

    /// Invokes the first stage with the URL because no record exists yet.
    ///
    /// Returns `None` in dry-run mode, which ends the run.
    async fn bootstrap(
        &self,
        url: &str,
        summary: &mut RunSummary,
    ) -> Result<Option<(StoredRecord, String)>, RouterError> {
        let first = self.catalog.first();
        info!(stage = %first.name, "No metadata record found, bootstrapping");
        self.events
            .emit(
                "pipeline.bootstrap",
                Some(serde_json::json!({"url": url, "stage": first.name})),
            )
            .await;

        let started = Instant::now();
        let result = self.executor.run(&first.executable, url).await;
        let duration_ms = elapsed_ms(started);

        let outcome = Self::outcome_for(first, url, &result)
            .with_duration_ms(duration_ms)
            .as_bootstrap();
        self.events
            .emit(outcome.status.event_type(), Some(outcome.to_event_data(url)))
            .await;
        summary.outcomes.push(outcome);

        match result {
            ExecutionResult::DryRun { .. } => Ok(None),
            ExecutionResult::Failed { stderr, exit_code } => Err(BootstrapError::StageFailed {
                stage: first.name.clone(),
                url: url.to_string(),
                stderr,
                exit_code,
            }
            .into()),
            ExecutionResult::Succeeded { artifact } => {
                let stored = self.store.find(url).await?.ok_or_else(|| {
                    BootstrapError::RecordMissing {
                        stage: first.name.clone(),
                        url: url.to_string(),
                    }
                })?;
                summary.bootstrapped = true;
                Ok(Some((stored, artifact)))
            }
        }
    }

    /// Folds the bootstrap result into the freshly created record.
    fn reconcile_bootstrap(spec: &StageSpec, artifact: &str, state: &mut RunState) {
        match state.record.stage(&spec.name) {
            StageState::Completed(path) => {
                let adopted = if path.is_empty() { artifact } else { path.as_str() };
                state.adopt(adopted);
            }
            _ if !artifact.is_empty() => {
                state
                    .record
                    .set_stage(spec.name.clone(), StageState::completed(artifact));
                state.adopt(artifact);
            }
            other => {
                debug!(stage = %spec.name, state = %other, "Bootstrap reported no artifact");
            }
        }
    }

    async fn evaluate(
        &self,
        index: usize,
        spec: &StageSpec,
        url: &str,
        state: &mut RunState,
    ) -> StageOutcome {
        match state.record.stage(&spec.name) {
            StageState::Completed(path) => {
                state.adopt(&path);
                StageOutcome::new(&spec.name, StageStatus::CompletedPreviously).with_artifact(path)
            }
            StageState::Skip => StageOutcome::new(&spec.name, StageStatus::Skipped),
            StageState::Requested => {
                let input = if index == 0 {
                    url.to_string()
                } else {
                    state.current_artifact.clone()
                };

                if let Some(blocker) = state.failures.blocking_stage() {
                    return StageOutcome::new(&spec.name, StageStatus::Blocked)
                        .with_input(input)
                        .with_detail(format!("upstream stage '{blocker}' failed in this run"));
                }
                if input.is_empty() {
                    return StageOutcome::new(&spec.name, StageStatus::MissingInput)
                        .with_detail("no upstream artifact available");
                }

                let started = Instant::now();
                let result = self.executor.run(&spec.executable, &input).await;
                let duration_ms = elapsed_ms(started);

                match &result {
                    ExecutionResult::Succeeded { artifact } => {
                        state
                            .record
                            .set_stage(spec.name.clone(), StageState::completed(artifact.as_str()));
                        state.adopt(artifact);
                    }
                    ExecutionResult::Failed { stderr, exit_code } => {
                        state.failures.record_failure(FailureRecord::new(
                            &spec.name,
                            stderr.as_str(),
                            *exit_code,
                        ));
                    }
                    ExecutionResult::DryRun { .. } => {}
                }
                Self::outcome_for(spec, &input, &result).with_duration_ms(duration_ms)
            }
        }
    }

    fn outcome_for(spec: &StageSpec, input: &str, result: &ExecutionResult) -> StageOutcome {
        match result {
            ExecutionResult::Succeeded { artifact } => {
                StageOutcome::new(&spec.name, StageStatus::Succeeded)
                    .with_input(input)
                    .with_artifact(artifact.as_str())
            }
            ExecutionResult::Failed { stderr, exit_code } => {
                StageOutcome::new(&spec.name, StageStatus::Failed)
                    .with_input(input)
                    .with_detail(stderr.as_str())
                    .with_exit_code(*exit_code)
            }
            ExecutionResult::DryRun { command } => StageOutcome::new(&spec.name, StageStatus::DryRun)
                .with_input(input)
                .with_detail(command.as_str()),
        }
    }

    fn warn_unknown_stages(&self, record: &MetadataRecord) {
        for name in record.stages.keys() {
            if !self.catalog.contains(name) {
                warn!(stage = %name, "Record names a stage with no catalog entry, leaving it untouched");
            }
        }
    }
}
