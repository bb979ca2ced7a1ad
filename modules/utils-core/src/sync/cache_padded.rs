use core::ops::{Deref, DerefMut};

#[cfg(test)]
mod tests;

/// Pads and aligns a value to a cache-line boundary.
///
/// Queue producer and consumer cursors live on their own lines so the
/// two sides do not false-share under contention.
#[derive(Debug, Default)]
#[repr(align(64))]
pub struct CachePadded<T> {
  value: T,
}

impl<T> CachePadded<T> {
  /// Wraps a value with cache-line padding.
  #[must_use]
  pub const fn new(value: T) -> Self {
    Self { value }
  }

  /// Consumes the wrapper and returns the inner value.
  #[must_use]
  pub fn into_inner(self) -> T {
    self.value
  }
}

impl<T> Deref for CachePadded<T> {
  type Target = T;

  fn deref(&self) -> &T {
    &self.value
  }
}

impl<T> DerefMut for CachePadded<T> {
  fn deref_mut(&mut self) -> &mut T {
    &mut self.value
  }
}
