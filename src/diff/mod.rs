//! Change detection

mod compare;

pub use compare::needs_transfer;
