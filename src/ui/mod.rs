//! Terminal output

pub mod progress;
pub mod summary;

pub use progress::ProgressReporter;
