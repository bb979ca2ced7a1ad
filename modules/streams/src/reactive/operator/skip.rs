use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, AtomicU64, Ordering};

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription, support::add_cap,
};

#[cfg(test)]
mod tests;

/// Drops the first `n` values; dropped values reach the discard hook.
pub(crate) struct SkipPublisher<T: Send + 'static> {
  source: Arc<dyn Publisher<T>>,
  count:  u64,
}

impl<T: Send + 'static> SkipPublisher<T> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, count: u64) -> Self {
    Self { source, count }
  }
}

impl<T: Send + 'static> Publisher<T> for SkipPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    self.source.subscribe(SkipSubscriber::new(subscriber, self.count));
  }
}

struct SkipSubscriber<T: Send + 'static> {
  weak_self:     Weak<Self>,
  downstream:    Arc<dyn CoreSubscriber<T>>,
  remaining:     AtomicU64,
  skip:          u64,
  first_request: AtomicBool,
  upstream:      DeferredSubscription<T>,
  done:          AtomicBool,
}

impl<T: Send + 'static> SkipSubscriber<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<T>>, count: u64) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      remaining: AtomicU64::new(count),
      skip: count,
      first_request: AtomicBool::new(false),
      upstream: DeferredSubscription::new(),
      done: AtomicBool::new(false),
    })
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for SkipSubscriber<T> {
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
    let remaining = self.remaining.load(Ordering::Relaxed);
    if remaining > 0 {
      self.remaining.store(remaining - 1, Ordering::Relaxed);
      hooks::on_discard(value, &self.context());
      return;
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

impl<T: Send + 'static> Subscription<T> for SkipSubscriber<T> {
  fn request(&self, n: u64) {
    // The first request pre-pays for the values that will be skipped.
    if self.first_request.swap(true, Ordering::AcqRel) {
      self.upstream.request(n);
    } else {
      self.upstream.request(add_cap(n, self.skip));
    }
  }

  fn cancel(&self) {
    self.upstream.cancel();
  }
}
