//! # davsync - Parallel WebDAV Synchronization
//!
//! Uploads a local file or directory tree to a WebDAV server, or downloads
//! a remote tree, with a fixed pool of workers that each hold one
//! connection. Files whose content already matches the other side are
//! skipped.

// Module declarations
pub mod commands;
pub mod config;
pub mod diff;
pub mod executor;
pub mod hash;
pub mod logging;
pub mod remote;
pub mod scanner;
pub mod types;
pub mod ui;

// Re-export commonly used types
pub use config::Config;
pub use executor::TransferSummary;
pub use types::{Operation, SyncError, TransferResult, TransferStatus, TransferTask};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
