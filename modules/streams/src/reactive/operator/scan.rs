use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, Ordering};
use spin::Mutex;

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
};

#[cfg(test)]
mod tests;

type Step<R, T> = Arc<dyn Fn(&R, T) -> R + Send + Sync>;

/// Emits the running accumulation of a step function, one output per
/// input.
pub(crate) struct ScanPublisher<T: Send + 'static, R: Clone + Send + Sync + 'static> {
  source: Arc<dyn Publisher<T>>,
  seed:   R,
  step:   Step<R, T>,
}

impl<T: Send + 'static, R: Clone + Send + Sync + 'static> ScanPublisher<T, R> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, seed: R, step: Step<R, T>) -> Self {
    Self { source, seed, step }
  }
}

impl<T: Send + 'static, R: Clone + Send + Sync + 'static> Publisher<R> for ScanPublisher<T, R> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<R>>) {
    self.source.subscribe(ScanSubscriber::new(subscriber, self.seed.clone(), self.step.clone()));
  }
}

struct ScanSubscriber<T: Send + 'static, R: Clone + Send + Sync + 'static> {
  weak_self:   Weak<Self>,
  downstream:  Arc<dyn CoreSubscriber<R>>,
  accumulated: Mutex<R>,
  step:        Step<R, T>,
  upstream:    DeferredSubscription<T>,
  done:        AtomicBool,
}

impl<T: Send + 'static, R: Clone + Send + Sync + 'static> ScanSubscriber<T, R> {
  fn new(downstream: Arc<dyn CoreSubscriber<R>>, seed: R, step: Step<R, T>) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      accumulated: Mutex::new(seed),
      step,
      upstream: DeferredSubscription::new(),
      done: AtomicBool::new(false),
    })
  }
}

impl<T: Send + 'static, R: Clone + Send + Sync + 'static> CoreSubscriber<T> for ScanSubscriber<T, R> {
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
    let next = {
      let mut accumulated = self.accumulated.lock();
      let next = (self.step)(&accumulated, value);
      *accumulated = next.clone();
      next
    };
    self.downstream.on_next(next);
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

impl<T: Send + 'static, R: Clone + Send + Sync + 'static> Subscription<R> for ScanSubscriber<T, R> {
  fn request(&self, n: u64) {
    self.upstream.request(n);
  }

  fn cancel(&self) {
    self.upstream.cancel();
  }
}
