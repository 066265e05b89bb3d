//! Core data types

pub mod error;
pub mod task;

pub use error::{RemoteError, SyncError};
pub use task::{Operation, TransferResult, TransferStatus, TransferTask};
