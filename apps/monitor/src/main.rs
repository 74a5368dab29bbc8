use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use monitor_core::{Monitor, Repositories};
use shared::{
    domain::{LogLevel, ResultFilter, ALL_JOBS},
    repo::{JobLogRepo, JobResultRepo, JobStatusRepo},
};
use storage::Storage;
use tokio_stream::StreamExt;
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

mod config;
mod console;

use config::{load_settings, DEFAULT_CONFIG_PATH};
use console::{log_row, result_row, status_row, summary_line};

const ERROR_LOG_PATH: &str = "error.log";

#[derive(Parser, Debug)]
#[command(about = "Watches ETL job results, statuses and logs")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refreshes every tab periodically and prints each state change.
    Watch(WatchArgs),
    /// Runs one repository call and prints the rows.
    Query {
        #[command(subcommand)]
        target: QueryTarget,
    },
}

#[derive(clap::Args, Debug)]
struct WatchArgs {
    #[arg(long, default_value = "")]
    result_prefix: String,
    #[arg(long, default_value_t = ResultFilter::All)]
    result_filter: ResultFilter,
    #[arg(long, default_value = ALL_JOBS)]
    job: String,
    #[arg(long, default_value = "")]
    status_filter: String,
    #[arg(long, default_value = "")]
    log_prefix: String,
    #[arg(long)]
    log_level: Option<LogLevel>,
    /// Rows printed under each loaded state.
    #[arg(long, default_value_t = 0)]
    rows: usize,
}

#[derive(Subcommand, Debug)]
enum QueryTarget {
    Results {
        #[arg(long, default_value = "")]
        prefix: String,
        #[arg(long, default_value_t = ResultFilter::All)]
        filter: ResultFilter,
        /// History of one job instead of the latest result per job.
        #[arg(long)]
        job: Option<String>,
    },
    Status {
        #[arg(long, default_value = "")]
        filter: String,
    },
    Log {
        #[arg(long, default_value = "")]
        prefix: String,
        #[arg(long)]
        level: Option<LogLevel>,
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(Path::new(ERROR_LOG_PATH))?;

    if let Err(err) = run(cli).await {
        error!(error = %format!("{err:#}"), "monitor exited with an error");
        return Err(err);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli.config)?;
    info!(config = %cli.config.display(), ?settings, "loaded settings");

    let storage = Arc::new(
        Storage::connect(&settings.to_storage_options())
            .await
            .context("failed to open the job database")?,
    );

    match cli.command {
        Command::Watch(args) => watch(storage, settings.to_monitor_settings(), args).await,
        Command::Query { target } => query(&storage, target, settings.max_log_entries).await,
    }
}

async fn watch(
    storage: Arc<Storage>,
    settings: monitor_core::MonitorSettings,
    args: WatchArgs,
) -> Result<()> {
    let monitor = Monitor::start(Repositories::shared(storage), settings)?;

    monitor
        .result_events()
        .set_filter(args.result_prefix, args.result_filter, args.job);
    monitor.status_events().set_filter(args.status_filter);
    monitor
        .log_events()
        .set_filter(args.log_prefix, args.log_level.unwrap_or_default());

    let rows = args.rows;
    let results = monitor.result_states().stream().map(move |state| {
        let mut lines = vec![summary_line("results", &state)];
        if state.kind() == "loaded" {
            lines.extend(state.rows().iter().take(rows).map(result_row));
        }
        lines
    });
    let statuses = monitor.status_states().stream().map(move |state| {
        let mut lines = vec![summary_line("status", &state)];
        if state.kind() == "loaded" {
            lines.extend(state.rows().iter().take(rows).map(status_row));
        }
        lines
    });
    let log = monitor.log_states().stream().map(move |state| {
        let mut lines = vec![summary_line("log", &state)];
        if state.kind() == "loaded" {
            lines.extend(state.rows().iter().take(rows).map(log_row));
        }
        lines
    });
    let mut updates = results.merge(statuses).merge(log);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                if let Err(err) = signal {
                    error!(error = %err, "failed to listen for ctrl-c");
                }
                info!("shutdown requested");
                break;
            }
            update = updates.next() => match update {
                Some(lines) => {
                    for line in lines {
                        println!("{line}");
                    }
                }
                None => break,
            },
        }
    }

    monitor.stop().await;
    Ok(())
}

async fn query(storage: &Storage, target: QueryTarget, max_log_entries: u32) -> Result<()> {
    let lines: Vec<String> = match target {
        QueryTarget::Results {
            prefix,
            filter,
            job,
        } => {
            let rows = match job.as_deref().filter(|job| *job != ALL_JOBS) {
                Some(job) => storage.fetch_for_job(job, filter).await?,
                None => storage.fetch_latest(&prefix, filter).await?,
            };
            rows.iter().map(result_row).collect()
        }
        QueryTarget::Status { filter } => {
            let rows = storage.fetch_all_latest().await?;
            monitor_core::job_status::filter_job_statuses(&rows, &filter)
                .iter()
                .map(status_row)
                .collect()
        }
        QueryTarget::Log {
            prefix,
            level,
            limit,
        } => storage
            .fetch_filtered(
                &prefix,
                level.unwrap_or_default(),
                limit.unwrap_or(max_log_entries),
            )
            .await?
            .iter()
            .map(log_row)
            .collect(),
    };

    for line in &lines {
        println!("{line}");
    }
    info!(rows = lines.len(), "query complete");
    Ok(())
}

/// Console output filtered by `RUST_LOG` (default `info`) plus an
/// error-only copy appended to `error_log`.
fn init_logging(error_log: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(error_log)
        .with_context(|| format!("failed to open '{}'", error_log.display()))?;

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    let errors = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::ERROR);

    tracing_subscriber::registry()
        .with(console)
        .with(errors)
        .init();
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
