use alloc::sync::{Arc, Weak};
use core::hash::{BuildHasherDefault, Hash};

use ahash::AHasher;
use hashbrown::HashSet;
use portable_atomic::{AtomicBool, Ordering};
use spin::Mutex;

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
};

#[cfg(test)]
mod tests;

type SeenSet<T> = HashSet<T, BuildHasherDefault<AHasher>>;

/// Relays each distinct value once.
///
/// Repeats are discarded; on the conditional path they do not consume
/// demand, otherwise a replacement unit is requested.
pub(crate) struct DistinctPublisher<T: Clone + Eq + Hash + Send + Sync + 'static> {
  source: Arc<dyn Publisher<T>>,
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> DistinctPublisher<T> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>) -> Self {
    Self { source }
  }
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> Publisher<T> for DistinctPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    self.source.subscribe(DistinctSubscriber::new(subscriber));
  }
}

struct DistinctSubscriber<T: Clone + Eq + Hash + Send + Sync + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<T>>,
  seen:       Mutex<SeenSet<T>>,
  upstream:   DeferredSubscription<T>,
  done:       AtomicBool,
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> DistinctSubscriber<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<T>>) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      seen: Mutex::new(SeenSet::default()),
      upstream: DeferredSubscription::new(),
      done: AtomicBool::new(false),
    })
  }

  fn remember(&self, value: &T) -> bool {
    self.seen.lock().insert(value.clone())
  }
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> CoreSubscriber<T> for DistinctSubscriber<T> {
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
    if self.remember(&value) {
      self.downstream.on_next(value);
    } else {
      hooks::on_discard(value, &self.context());
      self.upstream.request(1);
    }
  }

  fn try_on_next(&self, value: T) -> bool {
    if self.done.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return true;
    }
    if self.remember(&value) {
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
    self.seen.lock().clear();
    self.downstream.on_error(error);
  }

  fn on_complete(&self) {
    if !self.done.swap(true, Ordering::AcqRel) {
      self.seen.lock().clear();
      self.downstream.on_complete();
    }
  }
}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> Subscription<T> for DistinctSubscriber<T> {
  fn request(&self, n: u64) {
    self.upstream.request(n);
  }

  fn cancel(&self) {
    self.seen.lock().clear();
    self.upstream.cancel();
  }
}
