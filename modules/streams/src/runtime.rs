//! Std-side runtime integration.

/// Tokio-backed scheduler implementation.
mod tokio_scheduler;

pub use tokio_scheduler::TokioScheduler;
