//! Running a single batch item.

use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt::Debug;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, warn};

/// Exit code reported when a child could not be spawned or was killed.
const ABNORMAL_EXIT: i32 = 1;

/// Runs the pipeline for one URL and reports its exit code.
#[async_trait]
pub trait ItemRunner: Send + Sync + Debug {
    /// Runs one item to completion.
    ///
    /// Never fails: spawn errors and signals are mapped to a non-zero code.
    async fn run_item(&self, url: &str, dry_run: bool) -> i32;
}

/// Runs each item as a child process of `program`.
///
/// The child is invoked as `program <leading args> [--dry-run] <option args>
/// -- <url>` and inherits stdout and stderr, so its own log lines interleave
/// with the batch driver's. The URL always follows `--`, so a line starting
/// with `-` is never taken for a flag.
#[derive(Debug, Clone)]
pub struct ProcessItemRunner {
    program: PathBuf,
    leading_args: Vec<OsString>,
    option_args: Vec<OsString>,
}

impl ProcessItemRunner {
    /// Creates a runner for `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            option_args: Vec::new(),
        }
    }

    /// Arguments placed first, e.g. a subcommand.
    #[must_use]
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Options placed after the dry-run flag and before the URL separator.
    #[must_use]
    pub fn with_option_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.option_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Full argument vector for one item.
    #[must_use]
    pub fn args_for(&self, url: &str, dry_run: bool) -> Vec<OsString> {
        let mut args = self.leading_args.clone();
        if dry_run {
            args.push("--dry-run".into());
        }
        args.extend(self.option_args.iter().cloned());
        args.push("--".into());
        args.push(url.into());
        args
    }
}

#[async_trait]
impl ItemRunner for ProcessItemRunner {
    async fn run_item(&self, url: &str, dry_run: bool) -> i32 {
        let args = self.args_for(url, dry_run);
        debug!(program = %self.program.display(), ?args, "Spawning item");

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await;

        match status {
            Ok(status) => status.code().unwrap_or_else(|| {
                warn!(url, %status, "Item terminated without an exit code");
                ABNORMAL_EXIT
            }),
            Err(err) => {
                error!(url, error = %err, "Failed to spawn item");
                ABNORMAL_EXIT
            }
        }
    }
}
