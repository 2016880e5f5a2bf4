use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use stagerouter::config::RouterConfig;
use stagerouter::core::StageStatus;
use stagerouter::errors::RouterError;
use stagerouter::events::logging_sink;
use stagerouter::pipeline::PipelineDriver;
use stagerouter::stages::{ProcessExecutor, StageExecutor};
use stagerouter::store::DirectoryStore;

/// Execute the `run` command: drive one URL through the stage catalog.
///
/// Returns 0 once the record has been written back, even if some stages
/// failed; they stay requested for the next run.
pub async fn execute(config_path: Option<&Path>, url: &str, dry_run: bool) -> Result<i32> {
    let url = url.trim();
    if url.is_empty() {
        return Err(RouterError::usage("URL must not be empty").into());
    }

    let config = RouterConfig::load(config_path).context("Failed to load configuration")?;
    let catalog = config.catalog()?;

    tracing::debug!(
        metadata_dir = %config.metadata_dir.display(),
        stages = catalog.len(),
        policy = %config.downstream_policy,
        dry_run,
        "Configuration loaded"
    );

    let executor: Arc<dyn StageExecutor> = if dry_run {
        Arc::new(ProcessExecutor::dry_run())
    } else {
        Arc::new(ProcessExecutor::new())
    };
    let driver = PipelineDriver::new(
        catalog,
        Arc::new(DirectoryStore::new(&config.metadata_dir)),
        executor,
        logging_sink(),
    )
    .with_policy(config.downstream_policy);

    let summary = driver
        .run(url)
        .await
        .with_context(|| format!("Pipeline run failed for {url}"))?;

    if summary.dry_run {
        println!("Dry run for {url}:");
        for outcome in &summary.outcomes {
            match (&outcome.status, &outcome.detail) {
                (StageStatus::DryRun, Some(detail)) => println!("  {:<12} {detail}", outcome.stage),
                (status, _) => println!("  {:<12} {status}", outcome.stage),
            }
        }
    } else {
        println!(
            "{url}: {} stage(s) run, {} failed, current artifact: {}",
            summary.invoked_stages().len(),
            summary.failures.len(),
            if summary.final_artifact.is_empty() {
                "(none)"
            } else {
                summary.final_artifact.as_str()
            }
        );
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stagerouter::core::{MetadataRecord, StageState};
    use std::path::PathBuf;

    /// Writes a router config over `stages` into `dir`, with records kept in
    /// `dir/metadata`.
    fn write_config(dir: &Path, stages: &[(&str, &str)]) -> PathBuf {
        let metadata = dir.join("metadata");
        std::fs::create_dir_all(&metadata).unwrap();
        let stages = stages
            .iter()
            .map(|(name, exe)| format!(r#"{{"name":"{name}","executable":"{exe}"}}"#))
            .collect::<Vec<_>>()
            .join(",");
        let path = dir.join("router.json");
        std::fs::write(
            &path,
            format!(
                r#"{{"metadata_dir":"{}","stages":[{stages}]}}"#,
                metadata.display()
            ),
        )
        .unwrap();
        path
    }

    #[tokio::test]
    async fn test_empty_url_is_a_usage_error() {
        let err = execute(None, "   ", false).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RouterError>(),
            Some(RouterError::Usage(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_bootstrap_failure_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let config = write_config(tmp.path(), &[("download", "false"), ("clip", "true")]);

        let err = execute(Some(config.as_path()), "u1", false).await.unwrap_err();

        assert!(format!("{err:#}").contains("Pipeline run failed for u1"));
        assert_eq!(std::fs::read_dir(tmp.path().join("metadata")).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stage_failure_still_exits_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let config = write_config(
            tmp.path(),
            &[
                ("download", "true"),
                ("watermark", "false"),
                ("clip", "echo"),
            ],
        );
        let record_path = tmp.path().join("metadata").join("u1.json");
        std::fs::write(
            &record_path,
            r#"{"url":"u1","stages":{"download":"/tmp/a.mp4","watermark":true,"clip":true}}"#,
        )
        .unwrap();

        assert_eq!(execute(Some(config.as_path()), "u1", false).await.unwrap(), 0);

        let record =
            MetadataRecord::from_json(&std::fs::read_to_string(&record_path).unwrap()).unwrap();
        assert_eq!(record.stage("watermark"), StageState::Requested);
        assert_eq!(record.stage("clip"), StageState::completed("/tmp/a.mp4"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dry_run_without_record_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let config = write_config(tmp.path(), &[("download", "false")]);

        assert_eq!(execute(Some(config.as_path()), "u1", true).await.unwrap(), 0);
        assert_eq!(std::fs::read_dir(tmp.path().join("metadata")).unwrap().count(), 0);
    }
}
