use alloc::sync::Arc;
use core::fmt;

/// Cloneable carrier for a user-supplied error.
///
/// Terminal signals may be delivered to several subscribers (multicast)
/// and stored for replay, so the payload is reference-counted rather
/// than owned.
#[derive(Clone)]
pub struct UserError {
  inner: Arc<dyn core::error::Error + Send + Sync>,
}

impl UserError {
  /// Wraps an arbitrary error value.
  pub fn new<E>(error: E) -> Self
  where
    E: core::error::Error + Send + Sync + 'static, {
    Self { inner: Arc::new(error) }
  }

  /// Wraps an already shared error value.
  #[must_use]
  pub fn from_shared(error: Arc<dyn core::error::Error + Send + Sync>) -> Self {
    Self { inner: error }
  }

  /// Returns the wrapped error.
  #[must_use]
  pub fn inner(&self) -> &(dyn core::error::Error + Send + Sync) {
    self.inner.as_ref()
  }

  /// Returns `true` when both carriers point at the same error value.
  #[must_use]
  pub fn same_as(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }
}

impl fmt::Debug for UserError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(&self.inner, f)
  }
}

impl fmt::Display for UserError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.inner, f)
  }
}

impl PartialEq for UserError {
  fn eq(&self, other: &Self) -> bool {
    self.same_as(other)
  }
}
