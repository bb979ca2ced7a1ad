use alloc::sync::{Arc, Weak};

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
};

/// Relays only the terminal; every value is discarded.
///
/// Drains upstream with unbounded demand since nothing is ever
/// forwarded.
pub(crate) struct IgnoreElementsPublisher<T: Send + 'static> {
  source: Arc<dyn Publisher<T>>,
}

impl<T: Send + 'static> IgnoreElementsPublisher<T> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>) -> Self {
    Self { source }
  }
}

impl<T: Send + 'static> Publisher<T> for IgnoreElementsPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    self.source.subscribe(IgnoreElementsSubscriber::new(subscriber));
  }
}

struct IgnoreElementsSubscriber<T: Send + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<T>>,
  upstream:   DeferredSubscription<T>,
}

impl<T: Send + 'static> IgnoreElementsSubscriber<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<T>>) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      upstream: DeferredSubscription::new(),
    })
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for IgnoreElementsSubscriber<T> {
  fn context(&self) -> Context {
    self.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    if !self.upstream.set(subscription) {
      return;
    }
    if let Some(this) = self.weak_self.upgrade() {
      self.downstream.on_subscribe(this);
    }
    self.upstream.request(u64::MAX);
  }

  fn on_next(&self, value: T) {
    hooks::on_discard(value, &self.context());
  }

  fn on_error(&self, error: StreamError) {
    self.downstream.on_error(error);
  }

  fn on_complete(&self) {
    self.downstream.on_complete();
  }
}

impl<T: Send + 'static> Subscription<T> for IgnoreElementsSubscriber<T> {
  fn request(&self, n: u64) {
    // Upstream already runs unbounded; downstream demand is moot for a
    // value-free sequence.
    let _ = n;
  }

  fn cancel(&self) {
    self.upstream.cancel();
  }
}
