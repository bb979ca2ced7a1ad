//! Single-producer/single-consumer queues used between operator stages.
//!
//! Three backends cover the capacity spectrum: a one-slot cell for
//! prefetch-one stages, a bounded power-of-two ring for known prefetch,
//! and an unbounded linked-chunk queue for sinks whose capacity is not
//! known up front. [`QueueFactory`] keys the choice off a requested
//! capacity.

/// One-slot queue backend.
mod one_slot_queue;
/// Queue factory keyed by requested capacity.
mod queue_factory;
/// Shared slot cell used by every backend.
mod slot;
/// Unbounded linked-chunk queue backend.
mod spsc_linked_queue;
/// Shared queue trait.
mod spsc_queue;
/// Bounded ring queue backend.
mod spsc_ring_queue;

pub use one_slot_queue::OneSlotQueue;
pub use queue_factory::QueueFactory;
pub use spsc_linked_queue::SpscLinkedQueue;
pub use spsc_queue::SpscQueue;
pub use spsc_ring_queue::SpscRingQueue;
