use core::{cell::UnsafeCell, mem::MaybeUninit};

use portable_atomic::{AtomicBool, Ordering};

/// One queue cell: a ready flag plus uninitialized storage.
///
/// The producer writes the value before releasing `ready`; the consumer
/// acquires `ready` before reading. Ownership of the storage alternates
/// strictly between the two sides, so each side has exclusive access to
/// the cell whenever it observes the flag in its own phase.
pub(super) struct Slot<T> {
  ready: AtomicBool,
  value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
  pub(super) fn new() -> Self {
    Self { ready: AtomicBool::new(false), value: UnsafeCell::new(MaybeUninit::uninit()) }
  }

  /// Returns `true` when the slot currently holds a value.
  pub(super) fn is_ready(&self) -> bool {
    self.ready.load(Ordering::Acquire)
  }

  /// Producer side: stores a value into an empty slot.
  ///
  /// Must only be called when [`Slot::is_ready`] returned `false` on
  /// the producer thread.
  pub(super) fn publish(&self, value: T) {
    // SAFETY: the slot is empty and the single producer owns the cell
    // until the ready flag is released below.
    unsafe { (*self.value.get()).write(value) };
    self.ready.store(true, Ordering::Release);
  }

  /// Consumer side: takes the value out of a ready slot.
  ///
  /// Must only be called when [`Slot::is_ready`] returned `true` on
  /// the consumer thread.
  pub(super) fn consume(&self) -> T {
    // SAFETY: the acquired ready flag guarantees the producer's write
    // is visible and the single consumer owns the cell until the flag
    // is cleared below.
    let value = unsafe { (*self.value.get()).assume_init_read() };
    self.ready.store(false, Ordering::Release);
    value
  }
}

// SAFETY: the alternating-ownership protocol above means the cell is
// never accessed concurrently from both sides for the same phase.
unsafe impl<T: Send> Send for Slot<T> {}
// SAFETY: see above.
unsafe impl<T: Send> Sync for Slot<T> {}

impl<T> Drop for Slot<T> {
  fn drop(&mut self) {
    if self.ready.load(Ordering::Relaxed) {
      // SAFETY: exclusive access in drop; the flag says the value is live.
      unsafe { (*self.value.get()).assume_init_drop() };
    }
  }
}
