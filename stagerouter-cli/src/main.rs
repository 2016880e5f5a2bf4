mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use logging::LogFormat;

#[derive(Parser, Debug)]
#[command(
    name = "stagerouter",
    version,
    about = "Resumable stage routing for URL work items"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the router configuration file (default: conf/router.json if present)
    #[arg(long, global = true, env = "STAGEROUTER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the stage pipeline once for a single URL
    Run {
        /// The work item URL
        url: String,
        /// Report what would run without spawning stages or writing the record
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the pipeline for every URL in a file, one at a time
    Batch {
        /// File with one URL per line; blank lines and `#` comments are ignored
        url_file: PathBuf,
        /// Forward --dry-run to every item
        #[arg(long)]
        dry_run: bool,
        /// Stop at the first failing item and exit with its code
        #[arg(long)]
        stop_on_error: bool,
        /// Seconds between progress lines for a long-running item
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        heartbeat_seconds: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    logging::init(&cli.log_level, cli.log_format);

    let result = match cli.command {
        Commands::Run { url, dry_run } => {
            commands::run::execute(cli.config.as_deref(), &url, dry_run).await
        }
        Commands::Batch {
            url_file,
            dry_run,
            stop_on_error,
            heartbeat_seconds,
        } => {
            let options = commands::batch::BatchArgs {
                url_file,
                dry_run,
                stop_on_error,
                heartbeat_seconds,
                config: cli.config,
                log_level: cli.log_level,
                log_format: cli.log_format,
            };
            commands::batch::execute(options).await
        }
    };

    match result {
        Ok(code) => ExitCode::from(commands::clamp_exit_code(code)),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["stagerouter", "run", "https://v.example/1", "--dry-run"])
            .unwrap();
        match cli.command {
            Commands::Run { url, dry_run } => {
                assert_eq!(url, "https://v.example/1");
                assert!(dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn test_parse_forwarded_child_arguments() {
        let cli = Cli::try_parse_from([
            "stagerouter",
            "run",
            "--dry-run",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "--",
            "-odd-url",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { url, dry_run } => {
                assert_eq!(url, "-odd-url");
                assert!(dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_parse_batch_with_global_flags() {
        let cli = Cli::try_parse_from([
            "stagerouter",
            "batch",
            "urls.txt",
            "--stop-on-error",
            "--heartbeat-seconds",
            "5",
            "--config",
            "conf/other.json",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("conf/other.json")));
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Batch {
                url_file,
                dry_run,
                stop_on_error,
                heartbeat_seconds,
            } => {
                assert_eq!(url_file, PathBuf::from("urls.txt"));
                assert!(!dry_run);
                assert!(stop_on_error);
                assert_eq!(heartbeat_seconds, Some(5));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_usage_errors() {
        assert!(Cli::try_parse_from(["stagerouter", "run"]).is_err());
        assert!(Cli::try_parse_from(["stagerouter", "batch"]).is_err());
        assert!(
            Cli::try_parse_from(["stagerouter", "batch", "u.txt", "--heartbeat-seconds", "0"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["stagerouter", "run", "u", "--bogus"]).is_err());
    }
}
