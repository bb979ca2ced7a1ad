//! Protocol probes for tests.
//!
//! Compiled unconditionally so downstream crates can drive their own
//! operator tests with the same tooling this crate uses.

/// Hand-driven scheduler with a manual clock.
mod deterministic_scheduler;
/// Scripted publisher that can honour or violate the protocol.
mod test_publisher;
/// Demand-aware recording sink.
mod test_subscriber;

pub use deterministic_scheduler::DeterministicScheduler;
pub use test_publisher::TestPublisher;
pub use test_subscriber::TestSubscriber;
