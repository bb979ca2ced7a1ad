use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription, support::add_cap_atomic,
};

#[cfg(test)]
mod tests;

/// Substitutes one fallback value when the source completes empty.
///
/// The fallback respects backpressure: with no outstanding demand at
/// completion time it is parked until the downstream requests.
pub(crate) struct DefaultIfEmptyPublisher<T: Clone + Send + Sync + 'static> {
  source:   Arc<dyn Publisher<T>>,
  fallback: T,
}

impl<T: Clone + Send + Sync + 'static> DefaultIfEmptyPublisher<T> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, fallback: T) -> Self {
    Self { source, fallback }
  }
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> for DefaultIfEmptyPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    self.source.subscribe(DefaultIfEmptySubscriber::new(subscriber, self.fallback.clone()));
  }
}

struct DefaultIfEmptySubscriber<T: Clone + Send + Sync + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<T>>,
  parked:     Mutex<Option<T>>,
  has_value:  AtomicBool,
  armed:      AtomicBool,
  requested:  AtomicU64,
  upstream:   DeferredSubscription<T>,
  done:       AtomicBool,
}

impl<T: Clone + Send + Sync + 'static> DefaultIfEmptySubscriber<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<T>>, fallback: T) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      parked: Mutex::new(Some(fallback)),
      has_value: AtomicBool::new(false),
      armed: AtomicBool::new(false),
      requested: AtomicU64::new(0),
      upstream: DeferredSubscription::new(),
      done: AtomicBool::new(false),
    })
  }

  fn emit_parked(&self) {
    let value = self.parked.lock().take();
    if let Some(value) = value {
      self.downstream.on_next(value);
      self.downstream.on_complete();
    }
  }
}

impl<T: Clone + Send + Sync + 'static> CoreSubscriber<T> for DefaultIfEmptySubscriber<T> {
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
    self.has_value.store(true, Ordering::Release);
    self.downstream.on_next(value);
  }

  fn on_error(&self, error: StreamError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.context());
      return;
    }
    self.downstream.on_error(error);
  }

  fn on_complete(&self) {
    if self.done.swap(true, Ordering::AcqRel) {
      return;
    }
    if self.has_value.load(Ordering::Acquire) {
      self.downstream.on_complete();
      return;
    }
    self.armed.store(true, Ordering::Release);
    if self.requested.load(Ordering::Acquire) > 0 {
      self.emit_parked();
    }
    // Otherwise the fallback stays parked until demand arrives.
  }
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> for DefaultIfEmptySubscriber<T> {
  fn request(&self, n: u64) {
    add_cap_atomic(&self.requested, n);
    if self.done.load(Ordering::Acquire) && !self.has_value.load(Ordering::Acquire) {
      self.emit_parked();
      return;
    }
    self.upstream.request(n);
  }

  fn cancel(&self) {
    if self.armed.load(Ordering::Acquire) {
      let parked = self.parked.lock().take();
      if let Some(value) = parked {
        hooks::on_discard(value, &self.context());
      }
    }
    self.upstream.cancel();
  }
}
