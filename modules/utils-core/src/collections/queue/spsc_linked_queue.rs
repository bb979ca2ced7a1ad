use alloc::boxed::Box;
use core::ptr;

use portable_atomic::{AtomicPtr, AtomicUsize, Ordering};

use super::{slot::Slot, spsc_queue::SpscQueue};
use crate::sync::CachePadded;

#[cfg(test)]
mod tests;

const CHUNK: usize = 32;

struct Chunk<T> {
  slots: [Slot<T>; CHUNK],
  next:  AtomicPtr<Chunk<T>>,
}

impl<T> Chunk<T> {
  fn allocate() -> *mut Self {
    let chunk = Self {
      slots: core::array::from_fn(|_| Slot::new()),
      next:  AtomicPtr::new(ptr::null_mut()),
    };
    Box::into_raw(Box::new(chunk))
  }
}

/// Unbounded single-producer/single-consumer queue over linked chunks.
///
/// Values live in fixed power-of-two arrays; when the producer fills a
/// chunk it allocates the successor and links it through a forward
/// pointer before publishing into it. The consumer frees each chunk as
/// it crosses into the next one.
pub struct SpscLinkedQueue<T> {
  producer_chunk: CachePadded<AtomicPtr<Chunk<T>>>,
  producer_index: AtomicUsize,
  producer_base:  AtomicUsize,
  consumer_chunk: CachePadded<AtomicPtr<Chunk<T>>>,
  consumer_index: AtomicUsize,
  consumer_base:  AtomicUsize,
}

impl<T: Send> SpscLinkedQueue<T> {
  /// Creates an empty queue with one pre-allocated chunk.
  #[must_use]
  pub fn new() -> Self {
    let first = Chunk::allocate();
    Self {
      producer_chunk: CachePadded::new(AtomicPtr::new(first)),
      producer_index: AtomicUsize::new(0),
      producer_base:  AtomicUsize::new(0),
      consumer_chunk: CachePadded::new(AtomicPtr::new(first)),
      consumer_index: AtomicUsize::new(0),
      consumer_base:  AtomicUsize::new(0),
    }
  }
}

impl<T: Send> Default for SpscLinkedQueue<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Send> SpscQueue<T> for SpscLinkedQueue<T> {
  fn offer(&self, value: T) -> Result<(), T> {
    let index = self.producer_index.load(Ordering::Relaxed);
    let base = self.producer_base.load(Ordering::Relaxed);
    let mut chunk = self.producer_chunk.load(Ordering::Relaxed);
    if index.wrapping_sub(base) == CHUNK {
      let next = Chunk::allocate();
      // SAFETY: the producer owns `chunk` until the consumer crosses
      // into `next`, which cannot happen before the link below.
      unsafe { (*chunk).next.store(next, Ordering::Release) };
      self.producer_chunk.store(next, Ordering::Relaxed);
      self.producer_base.store(index, Ordering::Relaxed);
      chunk = next;
    }
    let base = self.producer_base.load(Ordering::Relaxed);
    // SAFETY: chunks are freed only after the single consumer has moved
    // past them, and the consumer can never pass the producer cursor.
    let slot = unsafe { &(*chunk).slots[index.wrapping_sub(base)] };
    slot.publish(value);
    self.producer_index.store(index.wrapping_add(1), Ordering::Release);
    Ok(())
  }

  fn poll(&self) -> Option<T> {
    let index = self.consumer_index.load(Ordering::Relaxed);
    let base = self.consumer_base.load(Ordering::Relaxed);
    let mut chunk = self.consumer_chunk.load(Ordering::Relaxed);
    if index.wrapping_sub(base) == CHUNK {
      // SAFETY: the consumer owns `chunk` until it is freed right here.
      let next = unsafe { (*chunk).next.load(Ordering::Acquire) };
      if next.is_null() {
        return None;
      }
      // SAFETY: every slot of the exhausted chunk has been consumed and
      // the producer moved on when it linked `next`.
      unsafe { drop(Box::from_raw(chunk)) };
      self.consumer_chunk.store(next, Ordering::Relaxed);
      self.consumer_base.store(index, Ordering::Relaxed);
      chunk = next;
    }
    let base = self.consumer_base.load(Ordering::Relaxed);
    // SAFETY: see offer; the chunk is live while the consumer is in it.
    let slot = unsafe { &(*chunk).slots[index.wrapping_sub(base)] };
    if !slot.is_ready() {
      return None;
    }
    let value = slot.consume();
    self.consumer_index.store(index.wrapping_add(1), Ordering::Release);
    Some(value)
  }

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn len(&self) -> usize {
    let produced = self.producer_index.load(Ordering::Acquire);
    let consumed = self.consumer_index.load(Ordering::Acquire);
    produced.wrapping_sub(consumed)
  }

  fn capacity(&self) -> Option<usize> {
    None
  }

  fn clear_with(&self, sink: &mut dyn FnMut(T)) {
    while let Some(value) = self.poll() {
      sink(value);
    }
  }
}

// SAFETY: values only move across threads through the slot protocol.
unsafe impl<T: Send> Send for SpscLinkedQueue<T> {}
// SAFETY: see above.
unsafe impl<T: Send> Sync for SpscLinkedQueue<T> {}

impl<T> Drop for SpscLinkedQueue<T> {
  fn drop(&mut self) {
    // Slots drop their own live values; here only the chunk chain needs
    // to be freed, starting from the consumer side.
    let mut chunk = self.consumer_chunk.load(Ordering::Relaxed);
    while !chunk.is_null() {
      // SAFETY: exclusive access in drop; each chunk is freed once.
      let boxed = unsafe { Box::from_raw(chunk) };
      chunk = boxed.next.load(Ordering::Relaxed);
    }
  }
}
