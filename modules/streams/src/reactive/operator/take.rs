use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, AtomicU64, Ordering};

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription, support::complete_only,
};


/// Emits only the first `n` values, then cancels upstream and
/// completes.
pub(crate) struct TakePublisher<T: Send + 'static> {
  source: Arc<dyn Publisher<T>>,
  limit:  u64,
}

impl<T: Send + 'static> TakePublisher<T> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, limit: u64) -> Self {
    Self { source, limit }
  }
}

impl<T: Send + 'static> Publisher<T> for TakePublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    if self.limit == 0 {
      complete_only(&subscriber);
      return;
    }
    self.source.subscribe(TakeSubscriber::new(subscriber, self.limit));
  }
}

struct TakeSubscriber<T: Send + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<T>>,
  remaining:  AtomicU64,
  upstream:   DeferredSubscription<T>,
  done:       AtomicBool,
}

impl<T: Send + 'static> TakeSubscriber<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<T>>, limit: u64) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      remaining: AtomicU64::new(limit),
      upstream: DeferredSubscription::new(),
      done: AtomicBool::new(false),
    })
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for TakeSubscriber<T> {
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
    if self.done.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    let before = self.remaining.fetch_sub(1, Ordering::AcqRel);
    if before == 0 {
      self.remaining.store(0, Ordering::Relaxed);
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    self.downstream.on_next(value);
    if before == 1 && !self.done.swap(true, Ordering::AcqRel) {
      self.upstream.cancel();
      self.downstream.on_complete();
    }
  }

  fn on_error(&self, error: StreamError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.context());
      return;
    }
    self.downstream.on_error(error);
  }

  fn on_complete(&self) {
    if !self.done.swap(true, Ordering::AcqRel) {
      self.downstream.on_complete();
    }
  }
}

impl<T: Send + 'static> Subscription<T> for TakeSubscriber<T> {
  fn request(&self, n: u64) {
    self.upstream.request(n);
  }

  fn cancel(&self) {
    self.upstream.cancel();
  }
}
