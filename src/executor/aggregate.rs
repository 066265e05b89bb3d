//! Result aggregation
//!
//! A single aggregator owns the [`TransferSummary`] and is the only writer;
//! workers hand results over through the results queue.

use crate::types::{SyncError, TransferResult, TransferStatus};
use crate::ui::ProgressReporter;
use camino::Utf8PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Run-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub done: usize,
    pub failed: usize,
    pub already_exists: usize,
    /// Bytes of successfully transferred files
    pub total_bytes: u64,
    /// Per-task durations summed, as if a single worker did everything
    pub raw_time: Duration,
    /// Real time from first dispatch to last result
    pub wall_time: Duration,
    /// Source paths of failed tasks, in arrival order
    pub failed_paths: Vec<Utf8PathBuf>,
}

impl TransferSummary {
    pub fn count(&self, status: TransferStatus) -> usize {
        match status {
            TransferStatus::Done => self.done,
            TransferStatus::Failed => self.failed,
            TransferStatus::AlreadyExists => self.already_exists,
        }
    }

    /// Number of results recorded
    pub fn total(&self) -> usize {
        self.done + self.failed + self.already_exists
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Bytes per second a single worker would have achieved
    pub fn raw_throughput(&self) -> u64 {
        bytes_per_second(self.total_bytes, self.raw_time)
    }

    /// Bytes per second actually achieved by the pool
    pub fn actual_throughput(&self) -> u64 {
        bytes_per_second(self.total_bytes, self.wall_time)
    }
}

fn bytes_per_second(bytes: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (bytes as f64 / secs) as u64
    } else {
        0
    }
}

/// Folds exactly `expected` results into a summary
#[derive(Debug)]
pub struct ResultAggregator {
    expected: usize,
    summary: TransferSummary,
}

impl ResultAggregator {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            summary: TransferSummary::default(),
        }
    }

    pub fn received(&self) -> usize {
        self.summary.total()
    }

    pub fn is_complete(&self) -> bool {
        self.received() >= self.expected
    }

    pub fn record(&mut self, result: TransferResult) {
        let summary = &mut self.summary;
        match result.status {
            TransferStatus::Done => {
                summary.done += 1;
                summary.total_bytes += result.size;
                summary.raw_time += result.time_spent;
            }
            TransferStatus::AlreadyExists => {
                summary.already_exists += 1;
            }
            TransferStatus::Failed => {
                summary.failed += 1;
                match &result.error {
                    Some(e) => error!(file = %result.task.from, error = %e, "Transfer failed"),
                    None => error!(file = %result.task.from, "Transfer failed"),
                }
                summary.failed_paths.push(result.task.from);
            }
        }
    }

    pub fn finish(self, wall_time: Duration) -> TransferSummary {
        TransferSummary {
            wall_time,
            ..self.summary
        }
    }
}

/// Consume `expected` results from the queue.
///
/// Returns as soon as the count is reached, whether or not the queue is
/// closed. A queue that closes early means results were lost.
pub async fn collect_results(
    mut results: mpsc::Receiver<TransferResult>,
    expected: usize,
    mut progress: ProgressReporter,
) -> Result<TransferSummary, SyncError> {
    let started = Instant::now();
    let mut aggregator = ResultAggregator::new(expected);

    while !aggregator.is_complete() {
        match results.recv().await {
            Some(result) => {
                progress.record_result(&result);
                aggregator.record(result);
            }
            None => {
                progress.abandon();
                return Err(SyncError::Pool(format!(
                    "result queue closed after {} of {} results",
                    aggregator.received(),
                    expected
                )));
            }
        }
    }

    let summary = aggregator.finish(started.elapsed());
    progress.finish_transfer(&summary);
    debug!(results = summary.total(), "All results collected");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Operation, RemoteError, TransferTask};

    fn task(name: &str) -> TransferTask {
        TransferTask::new(Operation::Upload, format!("/src/{}", name), format!("/dst/{}", name))
    }

    fn mixed_results() -> Vec<TransferResult> {
        vec![
            TransferResult::done(task("a"), Duration::from_millis(100), 10),
            TransferResult::already_exists(task("b")),
            TransferResult::failed(
                task("c"),
                Duration::from_millis(50),
                7,
                RemoteError::other("/dst/c", "boom").into(),
            ),
            TransferResult::done(task("d"), Duration::from_millis(300), 30),
        ]
    }

    #[test]
    fn test_record_updates_per_status() {
        let mut aggregator = ResultAggregator::new(4);
        for result in mixed_results() {
            aggregator.record(result);
        }
        assert!(aggregator.is_complete());

        let summary = aggregator.finish(Duration::from_millis(200));
        assert_eq!(summary.count(TransferStatus::Done), 2);
        assert_eq!(summary.count(TransferStatus::AlreadyExists), 1);
        assert_eq!(summary.count(TransferStatus::Failed), 1);
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.total_bytes, 40);
        assert_eq!(summary.raw_time, Duration::from_millis(400));
        assert_eq!(summary.failed_paths, vec![Utf8PathBuf::from("/src/c")]);
    }

    #[test]
    fn test_throughput() {
        let summary = TransferSummary {
            done: 1,
            total_bytes: 1000,
            raw_time: Duration::from_secs(4),
            wall_time: Duration::from_secs(1),
            ..TransferSummary::default()
        };
        assert_eq!(summary.raw_throughput(), 250);
        assert_eq!(summary.actual_throughput(), 1000);
        assert_eq!(TransferSummary::default().actual_throughput(), 0);
    }

    #[tokio::test]
    async fn test_collect_stops_at_expected_count_with_queue_open() {
        let (tx, rx) = mpsc::channel(2);
        let collector = tokio::spawn(collect_results(rx, 4, ProgressReporter::hidden()));

        for result in mixed_results() {
            tx.send(result).await.unwrap();
        }

        let summary = collector.await.unwrap().expect("all results arrived");
        assert_eq!(summary.total(), 4);
        assert!(summary.has_failures());
        // The sender is still alive; completion came from the count alone.
        drop(tx);
    }

    #[tokio::test]
    async fn test_collect_reports_lost_results() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(TransferResult::already_exists(task("a"))).await.unwrap();
        drop(tx);

        let err = collect_results(rx, 3, ProgressReporter::hidden()).await.unwrap_err();
        assert!(matches!(err, SyncError::Pool(_)));
        assert!(err.to_string().contains("1 of 3"));
    }

    #[tokio::test]
    async fn test_collect_nothing_expected() {
        let (_tx, rx) = mpsc::channel(1);
        let summary = collect_results(rx, 0, ProgressReporter::hidden()).await.unwrap();
        assert_eq!(summary.total(), 0);
    }
}
