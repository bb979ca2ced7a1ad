use alloc::sync::Arc;

use crate::reactive::{publisher::Publisher, stream_error::StreamError, subscriber::CoreSubscriber, support::error_only};

/// Source failing synchronously; the error is materialized lazily per
/// subscriber.
pub(crate) struct ErrorPublisher {
  supplier: Arc<dyn Fn() -> StreamError + Send + Sync>,
}

impl ErrorPublisher {
  pub(crate) fn new(supplier: Arc<dyn Fn() -> StreamError + Send + Sync>) -> Self {
    Self { supplier }
  }
}

impl<T: Send + 'static> Publisher<T> for ErrorPublisher {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    error_only(&subscriber, (self.supplier)());
  }
}
