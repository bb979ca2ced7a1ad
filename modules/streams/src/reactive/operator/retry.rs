use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use crate::reactive::{
  context::Context, hooks, publisher::Publisher, stream_error::StreamError, subscriber::CoreSubscriber,
  subscription::Subscription, subscription_arbiter::SubscriptionArbiter,
};

#[cfg(test)]
mod tests;

type RetryPredicate = Arc<dyn Fn(&StreamError) -> bool + Send + Sync>;

/// Resubscribes the source after matching failures.
///
/// The arbiter conserves outstanding demand across attempts; a
/// trampoline guards against synchronously failing sources.
pub(crate) struct RetryPublisher<T: Send + 'static> {
  source:    Arc<dyn Publisher<T>>,
  attempts:  u64,
  predicate: Option<RetryPredicate>,
}

impl<T: Send + 'static> RetryPublisher<T> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, attempts: u64, predicate: Option<RetryPredicate>) -> Self {
    Self { source, attempts, predicate }
  }
}

impl<T: Send + 'static> Publisher<T> for RetryPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    let coordinator =
      RetryCoordinator::new(subscriber, self.source.clone(), self.attempts, self.predicate.clone());
    coordinator.downstream.on_subscribe(coordinator.clone());
    self.source.subscribe(coordinator);
  }
}

struct RetryCoordinator<T: Send + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<T>>,
  source:     Arc<dyn Publisher<T>>,
  remaining:  AtomicU64,
  predicate:  Option<RetryPredicate>,
  arbiter:    SubscriptionArbiter<T>,
  produced:   AtomicU64,
  wip:        AtomicUsize,
  resubmit:   AtomicBool,
  done:       AtomicBool,
}

impl<T: Send + 'static> RetryCoordinator<T> {
  fn new(
    downstream: Arc<dyn CoreSubscriber<T>>,
    source: Arc<dyn Publisher<T>>,
    attempts: u64,
    predicate: Option<RetryPredicate>,
  ) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      source,
      remaining: AtomicU64::new(attempts),
      predicate,
      arbiter: SubscriptionArbiter::new(),
      produced: AtomicU64::new(0),
      wip: AtomicUsize::new(0),
      resubmit: AtomicBool::new(false),
      done: AtomicBool::new(false),
    })
  }

  fn resubscribe(&self) {
    self.resubmit.store(true, Ordering::Release);
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    loop {
      if self.arbiter.is_cancelled() {
        return;
      }
      if self.resubmit.swap(false, Ordering::AcqRel) {
        if let Some(this) = self.weak_self.upgrade() {
          self.source.subscribe(this);
        }
      }
      if self.wip.fetch_sub(1, Ordering::AcqRel) == 1 {
        return;
      }
    }
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for RetryCoordinator<T> {
  fn context(&self) -> Context {
    self.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    self.arbiter.set(subscription);
  }

  fn on_next(&self, value: T) {
    if self.done.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    self.produced.fetch_add(1, Ordering::AcqRel);
    self.downstream.on_next(value);
  }

  fn on_error(&self, error: StreamError) {
    if self.done.load(Ordering::Acquire) {
      hooks::on_error_dropped(&error, &self.context());
      return;
    }
    let matched = self.predicate.as_ref().map_or(true, |predicate| predicate(&error));
    let remaining = self.remaining.load(Ordering::Acquire);
    if matched && remaining > 0 {
      self.remaining.store(remaining - 1, Ordering::Release);
      let produced = self.produced.swap(0, Ordering::AcqRel);
      self.arbiter.produced(produced);
      self.resubscribe();
      return;
    }
    if !self.done.swap(true, Ordering::AcqRel) {
      self.downstream.on_error(error);
    }
  }

  fn on_complete(&self) {
    if !self.done.swap(true, Ordering::AcqRel) {
      self.downstream.on_complete();
    }
  }
}

impl<T: Send + 'static> Subscription<T> for RetryCoordinator<T> {
  fn request(&self, n: u64) {
    self.arbiter.request(n);
  }

  fn cancel(&self) {
    self.arbiter.cancel();
  }
}
