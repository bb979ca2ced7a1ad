use alloc::boxed::Box;

use super::{one_slot_queue::OneSlotQueue, spsc_linked_queue::SpscLinkedQueue, spsc_queue::SpscQueue, spsc_ring_queue::SpscRingQueue};

#[cfg(test)]
mod tests;

/// Chooses a queue backend for a requested capacity.
pub struct QueueFactory;

impl QueueFactory {
  /// Capacity above which requests are served by the unbounded backend.
  pub const UNBOUNDED_THRESHOLD: usize = 1 << 24;

  /// Returns a queue sized for the requested capacity.
  ///
  /// Capacity `1` maps to the one-slot cell, anything above
  /// [`QueueFactory::UNBOUNDED_THRESHOLD`] to the linked-chunk queue,
  /// and everything in between to a bounded ring of that size.
  #[must_use]
  pub fn for_capacity<T: Send + 'static>(capacity: usize) -> Box<dyn SpscQueue<T>> {
    if capacity <= 1 {
      Box::new(OneSlotQueue::new())
    } else if capacity > Self::UNBOUNDED_THRESHOLD {
      Box::new(SpscLinkedQueue::new())
    } else {
      Box::new(SpscRingQueue::with_capacity(capacity))
    }
  }

  /// Returns the unbounded backend directly.
  #[must_use]
  pub fn unbounded<T: Send + 'static>() -> Box<dyn SpscQueue<T>> {
    Box::new(SpscLinkedQueue::new())
  }

  /// Returns the one-slot backend directly.
  #[must_use]
  pub fn one<T: Send + 'static>() -> Box<dyn SpscQueue<T>> {
    Box::new(OneSlotQueue::new())
  }
}
