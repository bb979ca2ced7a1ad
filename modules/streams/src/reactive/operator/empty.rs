use alloc::sync::Arc;

use crate::reactive::{publisher::Publisher, subscriber::CoreSubscriber, support::complete_only};

/// Source completing synchronously with no values and no demand.
pub(crate) struct EmptyPublisher;

impl EmptyPublisher {
  pub(crate) const fn new() -> Self {
    Self
  }
}

impl<T: Send + 'static> Publisher<T> for EmptyPublisher {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    complete_only(&subscriber);
  }
}
