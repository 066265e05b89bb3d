//! Transfer tasks and their per-task outcomes

use super::SyncError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::time::Duration;

/// Direction of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Local tree -> remote tree
    Upload,
    /// Remote tree -> local tree
    Download,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Upload => write!(f, "upload"),
            Operation::Download => write!(f, "download"),
        }
    }
}

/// Transfer parameters for a single file.
///
/// `from` is a local path for uploads and a remote path for downloads;
/// `to` is the other side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    pub operation: Operation,
    pub from: Utf8PathBuf,
    pub to: Utf8PathBuf,
}

impl TransferTask {
    pub fn new(operation: Operation, from: impl Into<Utf8PathBuf>, to: impl Into<Utf8PathBuf>) -> Self {
        Self {
            operation,
            from: from.into(),
            to: to.into(),
        }
    }

    /// The side of the task that lives on the local filesystem
    pub fn local_path(&self) -> &Utf8Path {
        match self.operation {
            Operation::Upload => &self.from,
            Operation::Download => &self.to,
        }
    }

    /// The side of the task that lives on the remote server
    pub fn remote_path(&self) -> &Utf8Path {
        match self.operation {
            Operation::Upload => &self.to,
            Operation::Download => &self.from,
        }
    }
}

/// How a single transfer finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransferStatus {
    Done,
    Failed,
    AlreadyExists,
}

impl TransferStatus {
    pub const ALL: [TransferStatus; 3] = [
        TransferStatus::Done,
        TransferStatus::Failed,
        TransferStatus::AlreadyExists,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TransferStatus::Done => "Done",
            TransferStatus::Failed => "Failed",
            TransferStatus::AlreadyExists => "Already exists",
        }
    }
}

/// Outcome of one task, produced once by the worker that processed it.
///
/// Built through the constructors so a failed result always carries its
/// error and a skipped one never counts time or bytes.
#[derive(Debug)]
pub struct TransferResult {
    pub task: TransferTask,
    pub status: TransferStatus,
    pub time_spent: Duration,
    pub size: u64,
    pub error: Option<SyncError>,
}

impl TransferResult {
    pub fn done(task: TransferTask, time_spent: Duration, size: u64) -> Self {
        Self {
            task,
            status: TransferStatus::Done,
            time_spent,
            size,
            error: None,
        }
    }

    pub fn failed(task: TransferTask, time_spent: Duration, size: u64, error: SyncError) -> Self {
        Self {
            task,
            status: TransferStatus::Failed,
            time_spent,
            size,
            error: Some(error),
        }
    }

    pub fn already_exists(task: TransferTask) -> Self {
        Self {
            task,
            status: TransferStatus::AlreadyExists,
            time_spent: Duration::ZERO,
            size: 0,
            error: None,
        }
    }
}
