use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, Ordering};

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
};

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Discards the leading values matching the predicate, then relays the
/// rest; skipped values are replaced by fresh upstream demand.
pub(crate) struct SkipWhilePublisher<T: Send + 'static> {
  source:    Arc<dyn Publisher<T>>,
  predicate: Predicate<T>,
}

impl<T: Send + 'static> SkipWhilePublisher<T> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, predicate: Predicate<T>) -> Self {
    Self { source, predicate }
  }
}

impl<T: Send + 'static> Publisher<T> for SkipWhilePublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    self.source.subscribe(SkipWhileSubscriber::new(subscriber, self.predicate.clone()));
  }
}

struct SkipWhileSubscriber<T: Send + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<T>>,
  predicate:  Predicate<T>,
  skipping:   AtomicBool,
  upstream:   DeferredSubscription<T>,
  done:       AtomicBool,
}

impl<T: Send + 'static> SkipWhileSubscriber<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<T>>, predicate: Predicate<T>) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      predicate,
      skipping: AtomicBool::new(true),
      upstream: DeferredSubscription::new(),
      done: AtomicBool::new(false),
    })
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for SkipWhileSubscriber<T> {
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
    if self.skipping.load(Ordering::Acquire) {
      if (self.predicate)(&value) {
        hooks::on_discard(value, &self.context());
        self.upstream.request(1);
        return;
      }
      self.skipping.store(false, Ordering::Release);
    }
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
    if !self.done.swap(true, Ordering::AcqRel) {
      self.downstream.on_complete();
    }
  }
}

impl<T: Send + 'static> Subscription<T> for SkipWhileSubscriber<T> {
  fn request(&self, n: u64) {
    self.upstream.request(n);
  }

  fn cancel(&self) {
    self.upstream.cancel();
  }
}
