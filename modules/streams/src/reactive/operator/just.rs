use alloc::sync::Arc;

use crate::reactive::{
  publisher::Publisher, scalar_subscription::ScalarSubscription, subscriber::CoreSubscriber,
};

/// Scalar source: one known value, sync-fuseable.
pub(crate) struct JustPublisher<T> {
  value: T,
}

impl<T: Clone + Send + Sync + 'static> JustPublisher<T> {
  pub(crate) const fn new(value: T) -> Self {
    Self { value }
  }
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> for JustPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    let subscription = Arc::new(ScalarSubscription::new(subscriber.clone(), self.value.clone()));
    subscriber.on_subscribe(subscription);
  }
}
