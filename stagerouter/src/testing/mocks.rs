//! Scripted test doubles for executors and batch items.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::ItemRunner;
use crate::stages::{ExecutionResult, StageExecutor};

type RunHook = Box<dyn Fn(&str) + Send + Sync>;

/// An executor that replays scripted results and records every call.
///
/// Results are queued per executable path; an executable with nothing
/// queued succeeds with an empty artifact. Hooks run before the result is
/// returned, which lets a test play the part of a bootstrap stage that
/// writes a record.
#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<HashMap<PathBuf, VecDeque<ExecutionResult>>>,
    hooks: Mutex<HashMap<PathBuf, RunHook>>,
    calls: Mutex<Vec<(PathBuf, String)>>,
    dry_run: bool,
}

impl fmt::Debug for ScriptedExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedExecutor")
            .field("calls", &self.calls.lock().len())
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl ScriptedExecutor {
    /// Creates an executor where every stage succeeds with no artifact.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor that answers every call with a dry-run result.
    #[must_use]
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Queues a result for the next call to `executable`.
    #[must_use]
    pub fn respond(self, executable: impl Into<PathBuf>, result: ExecutionResult) -> Self {
        self.responses
            .lock()
            .entry(executable.into())
            .or_default()
            .push_back(result);
        self
    }

    /// Queues a success reporting `artifact`.
    #[must_use]
    pub fn succeed(self, executable: impl Into<PathBuf>, artifact: &str) -> Self {
        self.respond(executable, ExecutionResult::succeeded(artifact))
    }

    /// Queues a failure.
    #[must_use]
    pub fn fail(self, executable: impl Into<PathBuf>, stderr: &str, exit_code: i32) -> Self {
        self.respond(executable, ExecutionResult::failed(stderr, Some(exit_code)))
    }

    /// Runs `hook` with the input on every call to `executable`.
    #[must_use]
    pub fn on_run(
        self,
        executable: impl Into<PathBuf>,
        hook: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.lock().insert(executable.into(), Box::new(hook));
        self
    }

    /// Every call so far, as (executable, input).
    #[must_use]
    pub fn calls(&self) -> Vec<(PathBuf, String)> {
        self.calls.lock().clone()
    }

    /// Inputs passed to `executable`, in order.
    #[must_use]
    pub fn inputs_for(&self, executable: impl AsRef<Path>) -> Vec<String> {
        let executable = executable.as_ref();
        self.calls
            .lock()
            .iter()
            .filter(|(exe, _)| exe == executable)
            .map(|(_, input)| input.clone())
            .collect()
    }

    /// Total number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Forgets recorded calls. Queued results are kept.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl StageExecutor for ScriptedExecutor {
    async fn run(&self, executable: &Path, input: &str) -> ExecutionResult {
        self.calls
            .lock()
            .push((executable.to_path_buf(), input.to_string()));

        if self.dry_run {
            return ExecutionResult::dry_run(format!(
                "would run {} with {}",
                executable.display(),
                input
            ));
        }

        if let Some(hook) = self.hooks.lock().get(executable) {
            hook(input);
        }

        self.responses
            .lock()
            .get_mut(executable)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| ExecutionResult::succeeded(""))
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// A batch item runner with scripted exit codes and durations.
///
/// Durations elapse on the tokio clock, so tests using a paused runtime
/// run instantly.
#[derive(Debug, Default)]
pub struct ScriptedItemRunner {
    exit_codes: HashMap<String, i32>,
    durations: HashMap<String, Duration>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl ScriptedItemRunner {
    /// Creates a runner where every item exits 0 immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the exit code for `url`.
    #[must_use]
    pub fn with_exit_code(mut self, url: impl Into<String>, exit_code: i32) -> Self {
        self.exit_codes.insert(url.into(), exit_code);
        self
    }

    /// Sets how long `url` takes.
    #[must_use]
    pub fn with_duration(mut self, url: impl Into<String>, duration: Duration) -> Self {
        self.durations.insert(url.into(), duration);
        self
    }

    /// Every call so far, as (url, dry-run).
    #[must_use]
    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().clone()
    }

    /// URLs run so far, in order.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(url, _)| url.clone()).collect()
    }
}

#[async_trait]
impl ItemRunner for ScriptedItemRunner {
    async fn run_item(&self, url: &str, dry_run: bool) -> i32 {
        self.calls.lock().push((url.to_string(), dry_run));
        if let Some(duration) = self.durations.get(url) {
            tokio::time::sleep(*duration).await;
        }
        self.exit_codes.get(url).copied().unwrap_or(0)
    }
}
