use alloc::sync::{Arc, Weak};

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, publisher::Publisher, stream_error::StreamError,
  subscriber::CoreSubscriber, subscription::Subscription,
};


/// Opaque pass-through.
///
/// Interposes a subscriber that neither negotiates fusion nor exposes
/// the conditional path, so downstream optimizations see a plain
/// sequence.
pub(crate) struct HidePublisher<T: Send + 'static> {
  source: Arc<dyn Publisher<T>>,
}

impl<T: Send + 'static> HidePublisher<T> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>) -> Self {
    Self { source }
  }
}

impl<T: Send + 'static> Publisher<T> for HidePublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    self.source.subscribe(HideSubscriber::new(subscriber));
  }
}

struct HideSubscriber<T: Send + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<T>>,
  upstream:   DeferredSubscription<T>,
}

impl<T: Send + 'static> HideSubscriber<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<T>>) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      upstream: DeferredSubscription::new(),
    })
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for HideSubscriber<T> {
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
  }

  fn on_next(&self, value: T) {
    self.downstream.on_next(value);
  }

  fn on_error(&self, error: StreamError) {
    self.downstream.on_error(error);
  }

  fn on_complete(&self) {
    self.downstream.on_complete();
  }
}

impl<T: Send + 'static> Subscription<T> for HideSubscriber<T> {
  fn request(&self, n: u64) {
    self.upstream.request(n);
  }

  fn cancel(&self) {
    self.upstream.cancel();
  }
}
