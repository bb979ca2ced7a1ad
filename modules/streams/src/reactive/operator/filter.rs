use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, Ordering};

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
};

#[cfg(test)]
mod tests;

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Predicate gate.
///
/// Exposes the conditional path toward the producer: refused values do
/// not consume demand when the upstream understands `try_on_next`;
/// otherwise one replacement unit is requested per refusal. Refused
/// values always reach the discard hook. Fusion is refused because the
/// operator does not preserve cardinality.
pub(crate) struct FilterPublisher<T: Send + 'static> {
  source:    Arc<dyn Publisher<T>>,
  predicate: Predicate<T>,
}

impl<T: Send + 'static> FilterPublisher<T> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, predicate: Predicate<T>) -> Self {
    Self { source, predicate }
  }
}

impl<T: Send + 'static> Publisher<T> for FilterPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    self.source.subscribe(FilterSubscriber::new(subscriber, self.predicate.clone()));
  }
}

struct FilterSubscriber<T: Send + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<T>>,
  predicate:  Predicate<T>,
  upstream:   DeferredSubscription<T>,
  done:       AtomicBool,
}

impl<T: Send + 'static> FilterSubscriber<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<T>>, predicate: Predicate<T>) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      predicate,
      upstream: DeferredSubscription::new(),
      done: AtomicBool::new(false),
    })
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for FilterSubscriber<T> {
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
    if (self.predicate)(&value) {
      self.downstream.on_next(value);
    } else {
      hooks::on_discard(value, &self.context());
      // The producer counted this value against demand; replace it.
      self.upstream.request(1);
    }
  }

  fn try_on_next(&self, value: T) -> bool {
    if self.done.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return true;
    }
    if (self.predicate)(&value) {
      self.downstream.try_on_next(value)
    } else {
      hooks::on_discard(value, &self.context());
      false
    }
  }

  fn is_conditional(&self) -> bool {
    true
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

impl<T: Send + 'static> Subscription<T> for FilterSubscriber<T> {
  fn request(&self, n: u64) {
    self.upstream.request(n);
  }

  fn cancel(&self) {
    self.upstream.cancel();
  }
}
