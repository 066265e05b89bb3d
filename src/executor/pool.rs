//! Worker pool for concurrent transfers.
//!
//! - every worker owns one remote session, opened before any dispatch
//! - all workers pull from one bounded task queue
//! - all workers push into one bounded result queue drained by a single
//!   aggregator task
//! - dispatch blocks the calling thread while the task queue is full

use super::aggregate::{collect_results, TransferSummary};
use super::transfer::transfer;
use crate::config::Config;
use crate::diff::needs_transfer;
use crate::hash::HashAlgorithm;
use crate::remote::{Connector, RemoteClient};
use crate::types::{SyncError, TransferResult, TransferTask};
use crate::ui::ProgressReporter;
use camino::Utf8Path;
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Counters describing how work was spread over the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub dispatched: usize,
    pub per_worker_completed: Vec<usize>,
}

/// Multi-threaded runtime sized for `workers`
pub fn build_runtime(workers: usize) -> Result<Runtime, SyncError> {
    Builder::new_multi_thread()
        .worker_threads(workers.max(1))
        .enable_all()
        .build()
        .map_err(SyncError::Io)
}

/// Fixed-size pool of connected workers plus one result aggregator
pub struct TransferPool {
    handle: Handle,
    task_tx: Option<mpsc::Sender<TransferTask>>,
    worker_handles: Vec<JoinHandle<usize>>,
    aggregator: Option<JoinHandle<Result<TransferSummary, SyncError>>>,
    dispatched: usize,
}

impl TransferPool {
    /// Connect every worker and start the aggregator.
    ///
    /// `expected` is the number of tasks that will be dispatched; the
    /// aggregator completes once it has seen that many results. A worker
    /// that cannot connect fails the whole pool.
    pub fn start(
        handle: Handle,
        connector: &dyn Connector,
        config: &Config,
        expected: usize,
        progress: ProgressReporter,
    ) -> Result<Self, SyncError> {
        let workers = config.workers.max(1);
        let clients = handle.block_on(try_join_all(
            (0..workers).map(|_| connector.connect(&config.settings)),
        ))?;
        info!(workers, host = %config.settings.host, "Worker connections established");

        let (task_tx, task_rx) = mpsc::channel::<TransferTask>(config.task_queue_capacity());
        let (result_tx, result_rx) = mpsc::channel::<TransferResult>(config.result_queue_capacity());
        let task_rx = Arc::new(Mutex::new(task_rx));

        let aggregator = handle.spawn(collect_results(result_rx, expected, progress));

        let worker_handles = clients
            .into_iter()
            .enumerate()
            .map(|(id, client)| {
                handle.spawn(worker_loop(Worker {
                    id,
                    client,
                    tasks: Arc::clone(&task_rx),
                    results: result_tx.clone(),
                    algorithm: config.hash,
                }))
            })
            .collect();
        // Workers hold the only remaining senders.
        drop(result_tx);

        Ok(Self {
            handle,
            task_tx: Some(task_tx),
            worker_handles,
            aggregator: Some(aggregator),
            dispatched: 0,
        })
    }

    /// Push one task, blocking while the queue is full.
    pub fn enqueue(&mut self, task: TransferTask) -> Result<(), SyncError> {
        let sender = self
            .task_tx
            .as_ref()
            .ok_or_else(|| SyncError::Pool("task queue is already closed".to_string()))?;

        self.handle
            .block_on(sender.send(task))
            .map_err(|_| SyncError::Pool("all workers have stopped".to_string()))?;
        self.dispatched += 1;
        Ok(())
    }

    /// Close the task queue and wait for the aggregator and workers.
    pub fn close_and_wait(mut self) -> Result<(TransferSummary, PoolStats), SyncError> {
        self.task_tx.take();

        let aggregator = self.aggregator.take();
        let workers = std::mem::take(&mut self.worker_handles);
        let worker_count = workers.len();
        let dispatched = self.dispatched;

        self.handle.block_on(async move {
            let summary = match aggregator {
                Some(handle) => handle.await.map_err(map_join_error)??,
                None => return Err(SyncError::Pool("aggregator already consumed".to_string())),
            };

            let mut per_worker_completed = Vec::with_capacity(worker_count);
            for handle in workers {
                per_worker_completed.push(handle.await.map_err(map_join_error)?);
            }

            Ok((
                summary,
                PoolStats {
                    workers: worker_count,
                    dispatched,
                    per_worker_completed,
                },
            ))
        })
    }
}

struct Worker {
    id: usize,
    client: Box<dyn RemoteClient>,
    tasks: Arc<Mutex<mpsc::Receiver<TransferTask>>>,
    results: mpsc::Sender<TransferResult>,
    algorithm: HashAlgorithm,
}

/// Pull tasks until the queue is closed and drained; returns tasks processed
async fn worker_loop(worker: Worker) -> usize {
    let mut completed = 0usize;
    loop {
        let next = worker.tasks.lock().await.recv().await;
        let Some(task) = next else {
            break;
        };

        let result = process_task(worker.client.as_ref(), task, worker.algorithm).await;
        completed += 1;
        if worker.results.send(result).await.is_err() {
            debug!(worker = worker.id, "Result queue closed, stopping");
            break;
        }
    }
    debug!(worker = worker.id, completed, "Worker finished");
    completed
}

/// Change detection, then the transfer itself when needed
pub async fn process_task(
    client: &dyn RemoteClient,
    task: TransferTask,
    algorithm: HashAlgorithm,
) -> TransferResult {
    if !needs_transfer(client, &task, algorithm).await {
        return TransferResult::already_exists(task);
    }

    let started = Instant::now();
    let outcome = transfer(client, &task).await;
    let elapsed = started.elapsed();
    let size = local_size(task.local_path()).await;

    match outcome {
        Ok(()) => TransferResult::done(task, elapsed, size),
        Err(e) => TransferResult::failed(task, elapsed, size, e),
    }
}

async fn local_size(path: &Utf8Path) -> u64 {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            debug!(file = %path, error = %e, "Could not stat local file");
            0
        }
    }
}

fn map_join_error(error: tokio::task::JoinError) -> SyncError {
    SyncError::Pool(format!("worker pool task failed: {}", error))
}
