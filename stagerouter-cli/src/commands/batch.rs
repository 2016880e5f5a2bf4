use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use stagerouter::batch::{load_url_list, BatchDriver, BatchOptions, ProcessItemRunner};
use stagerouter::config::RouterConfig;
use stagerouter::events::logging_sink;

use crate::logging::LogFormat;

/// Arguments of the `batch` command.
#[derive(Debug)]
pub struct BatchArgs {
    pub url_file: PathBuf,
    pub dry_run: bool,
    pub stop_on_error: bool,
    pub heartbeat_seconds: Option<u64>,
    pub config: Option<PathBuf>,
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Options forwarded to every child ahead of the URL.
fn forwarded_args(args: &BatchArgs) -> Vec<OsString> {
    let mut forwarded = Vec::new();
    if let Some(config) = &args.config {
        forwarded.push(OsString::from("--config"));
        forwarded.push(config.clone().into_os_string());
    }
    forwarded.push("--log-level".into());
    forwarded.push(args.log_level.clone().into());
    forwarded.push("--log-format".into());
    forwarded.push(args.log_format.as_str().into());
    forwarded
}

/// The `--heartbeat-seconds` override, or the configured interval.
fn heartbeat_interval(args: &BatchArgs, config: &RouterConfig) -> Duration {
    args.heartbeat_seconds
        .map_or_else(|| config.heartbeat(), Duration::from_secs)
}

/// Execute the `batch` command: run each URL as a `run` child process.
pub async fn execute(args: BatchArgs) -> Result<i32> {
    let config =
        RouterConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let urls = load_url_list(&args.url_file)?;

    let heartbeat = heartbeat_interval(&args, &config);
    let options = BatchOptions::default()
        .with_dry_run(args.dry_run)
        .with_stop_on_error(args.stop_on_error)
        .with_heartbeat(heartbeat);

    let program = std::env::current_exe().context("Cannot locate the stagerouter executable")?;
    let runner = ProcessItemRunner::new(program)
        .with_leading_args(["run"])
        .with_option_args(forwarded_args(&args));

    tracing::info!(
        file = %args.url_file.display(),
        urls = urls.len(),
        heartbeat_seconds = heartbeat.as_secs(),
        "Loaded URL list"
    );

    let summary = BatchDriver::new(Arc::new(runner), logging_sink(), options)
        .run(&urls)
        .await?;

    println!("Batch complete: {summary}");
    Ok(summary.exit_code)
}
