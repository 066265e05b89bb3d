//! Main sync command

use crate::executor::{build_runtime, PoolStats, TransferPool, TransferSummary};
use crate::remote::{Connector, WebDavConnector};
use crate::scanner::{build_download_list, build_upload_list};
use crate::types::{Operation, SyncError, TransferTask};
use crate::ui::summary::{format_task_list, report};
use crate::ui::ProgressReporter;
use crate::Config;
use std::path::PathBuf;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// What a completed run produced
#[derive(Debug)]
pub struct RunOutcome {
    /// Enumerated tasks, in dispatch order
    pub tasks: Vec<TransferTask>,
    /// `None` for dry runs and empty task lists
    pub summary: Option<TransferSummary>,
    pub stats: Option<PoolStats>,
    pub failure_file: Option<PathBuf>,
}

/// Run the sync operation against the configured WebDAV server
pub fn run(config: Config) -> Result<RunOutcome, SyncError> {
    run_with(&config, &WebDavConnector)
}

/// Run the sync operation with sessions from `connector`.
///
/// Per-file failures are reported in the summary; only enumeration,
/// connection and pool errors are returned.
pub fn run_with(config: &Config, connector: &dyn Connector) -> Result<RunOutcome, SyncError> {
    let runtime = build_runtime(config.workers)?;

    let tasks = enumerate(&runtime, config, connector)?;
    info!(
        operation = %config.operation,
        source = %config.source,
        destination = %config.destination,
        tasks = tasks.len(),
        "Task list built"
    );

    if config.dry_run {
        println!("{}", format_task_list(&tasks));
        println!("Dry-run mode: no changes were made.");
        return Ok(RunOutcome::planned(tasks));
    }

    if tasks.is_empty() {
        println!("Nothing to transfer.");
        return Ok(RunOutcome::planned(tasks));
    }

    let mut progress = ProgressReporter::for_terminal(config.show_progress);
    progress.start_transfer(tasks.len() as u64);

    let mut pool = TransferPool::start(
        runtime.handle().clone(),
        connector,
        config,
        tasks.len(),
        progress,
    )?;
    for task in &tasks {
        pool.enqueue(task.clone())?;
    }
    let (summary, stats) = pool.close_and_wait()?;
    debug!(per_worker = ?stats.per_worker_completed, "Pool drained");

    let failure_file = report(&summary, &config.failures_dir);

    Ok(RunOutcome {
        tasks,
        summary: Some(summary),
        stats: Some(stats),
        failure_file,
    })
}

fn enumerate(
    runtime: &Runtime,
    config: &Config,
    connector: &dyn Connector,
) -> Result<Vec<TransferTask>, SyncError> {
    match config.operation {
        Operation::Upload => build_upload_list(&config.source, &config.destination),
        Operation::Download => runtime.block_on(async {
            let client = connector.connect(&config.settings).await?;
            build_download_list(client.as_ref(), &config.source, &config.destination).await
        }),
    }
}

impl RunOutcome {
    fn planned(tasks: Vec<TransferTask>) -> Self {
        Self {
            tasks,
            summary: None,
            stats: None,
            failure_file: None,
        }
    }
}
