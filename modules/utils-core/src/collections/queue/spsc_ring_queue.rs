use alloc::{boxed::Box, vec::Vec};

use portable_atomic::{AtomicUsize, Ordering};

use super::{slot::Slot, spsc_queue::SpscQueue};
use crate::sync::CachePadded;

#[cfg(test)]
mod tests;

/// Bounded single-producer/single-consumer ring queue.
///
/// Capacity is rounded up to a power of two so index wrapping is a
/// mask. Fullness and emptiness are detected through per-slot ready
/// flags, so neither side ever reads the other side's cursor on the
/// hot path; the cursors themselves are cache-padded.
pub struct SpscRingQueue<T> {
  mask:     usize,
  slots:    Box<[Slot<T>]>,
  producer: CachePadded<AtomicUsize>,
  consumer: CachePadded<AtomicUsize>,
}

impl<T: Send> SpscRingQueue<T> {
  /// Creates a ring with at least the requested capacity.
  #[must_use]
  pub fn with_capacity(capacity: usize) -> Self {
    let size = capacity.max(2).next_power_of_two();
    let slots = (0..size).map(|_| Slot::new()).collect::<Vec<_>>().into_boxed_slice();
    Self {
      mask: size - 1,
      slots,
      producer: CachePadded::new(AtomicUsize::new(0)),
      consumer: CachePadded::new(AtomicUsize::new(0)),
    }
  }
}

impl<T: Send> SpscQueue<T> for SpscRingQueue<T> {
  fn offer(&self, value: T) -> Result<(), T> {
    let cursor = self.producer.load(Ordering::Relaxed);
    let slot = &self.slots[cursor & self.mask];
    if slot.is_ready() {
      return Err(value);
    }
    slot.publish(value);
    self.producer.store(cursor.wrapping_add(1), Ordering::Release);
    Ok(())
  }

  fn poll(&self) -> Option<T> {
    let cursor = self.consumer.load(Ordering::Relaxed);
    let slot = &self.slots[cursor & self.mask];
    if !slot.is_ready() {
      return None;
    }
    let value = slot.consume();
    self.consumer.store(cursor.wrapping_add(1), Ordering::Release);
    Some(value)
  }

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn len(&self) -> usize {
    let produced = self.producer.load(Ordering::Acquire);
    let consumed = self.consumer.load(Ordering::Acquire);
    produced.wrapping_sub(consumed)
  }

  fn capacity(&self) -> Option<usize> {
    Some(self.mask + 1)
  }

  fn clear_with(&self, sink: &mut dyn FnMut(T)) {
    while let Some(value) = self.poll() {
      sink(value);
    }
  }
}
