//! Transfer execution: single-file transfers, the worker pool and result
//! aggregation

pub mod aggregate;
pub mod pool;
pub mod transfer;

pub use aggregate::{collect_results, ResultAggregator, TransferSummary};
pub use pool::{build_runtime, process_task, PoolStats, TransferPool};
pub use transfer::{download_one, transfer, upload_one};
