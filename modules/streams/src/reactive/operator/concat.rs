use alloc::{sync::{Arc, Weak}, vec::Vec};

use portable_atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use spin::Mutex;

use crate::reactive::{
  context::Context, hooks, publisher::Publisher, stream_error::StreamError, subscriber::CoreSubscriber,
  subscription::Subscription, subscription_arbiter::SubscriptionArbiter,
};

#[cfg(test)]
mod tests;

/// Sequential concatenation of a fixed list of sources.
///
/// One subscriber walks the sources through a subscription arbiter;
/// outstanding demand is conserved across the switch. A trampoline
/// keeps synchronous completions from recursing.
pub(crate) struct ConcatPublisher<T: Send + 'static> {
  sources:     Vec<Arc<dyn Publisher<T>>>,
  delay_error: bool,
}

impl<T: Send + 'static> ConcatPublisher<T> {
  pub(crate) fn new(sources: Vec<Arc<dyn Publisher<T>>>, delay_error: bool) -> Self {
    Self { sources, delay_error }
  }
}

impl<T: Send + 'static> Publisher<T> for ConcatPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    let coordinator = ConcatCoordinator::new(subscriber, self.sources.clone(), self.delay_error);
    coordinator.downstream.on_subscribe(coordinator.clone());
    coordinator.drain_next();
  }
}

struct ConcatCoordinator<T: Send + 'static> {
  weak_self:   Weak<Self>,
  downstream:  Arc<dyn CoreSubscriber<T>>,
  sources:     Vec<Arc<dyn Publisher<T>>>,
  index:       AtomicUsize,
  arbiter:     SubscriptionArbiter<T>,
  produced:    AtomicU64,
  wip:         AtomicUsize,
  delay_error: bool,
  errors:      Mutex<Vec<StreamError>>,
  done:        AtomicBool,
}

impl<T: Send + 'static> ConcatCoordinator<T> {
  fn new(
    downstream: Arc<dyn CoreSubscriber<T>>,
    sources: Vec<Arc<dyn Publisher<T>>>,
    delay_error: bool,
  ) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      sources,
      index: AtomicUsize::new(0),
      arbiter: SubscriptionArbiter::new(),
      produced: AtomicU64::new(0),
      wip: AtomicUsize::new(0),
      delay_error,
      errors: Mutex::new(Vec::new()),
      done: AtomicBool::new(false),
    })
  }

  /// Subscribes the next source; loops instead of recursing when a
  /// source terminates inside its own subscribe call.
  fn drain_next(&self) {
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    loop {
      if self.arbiter.is_cancelled() {
        return;
      }
      let index = self.index.fetch_add(1, Ordering::AcqRel);
      if index >= self.sources.len() {
        self.finish();
        return;
      }
      if let Some(this) = self.weak_self.upgrade() {
        self.sources[index].subscribe(this);
      }
      if self.wip.fetch_sub(1, Ordering::AcqRel) == 1 {
        return;
      }
    }
  }

  fn finish(&self) {
    if self.done.swap(true, Ordering::AcqRel) {
      return;
    }
    let mut errors = self.errors.lock();
    if errors.is_empty() {
      drop(errors);
      self.downstream.on_complete();
      return;
    }
    let error = if errors.len() == 1 {
      errors.remove(0)
    } else {
      StreamError::Composite(core::mem::take(&mut *errors))
    };
    drop(errors);
    self.downstream.on_error(error);
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for ConcatCoordinator<T> {
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
    if self.delay_error {
      self.errors.lock().push(error);
      let produced = self.produced.swap(0, Ordering::AcqRel);
      self.arbiter.produced(produced);
      self.drain_next();
      return;
    }
    if !self.done.swap(true, Ordering::AcqRel) {
      self.downstream.on_error(error);
    }
  }

  fn on_complete(&self) {
    if self.done.load(Ordering::Acquire) {
      return;
    }
    let produced = self.produced.swap(0, Ordering::AcqRel);
    self.arbiter.produced(produced);
    self.drain_next();
  }
}

impl<T: Send + 'static> Subscription<T> for ConcatCoordinator<T> {
  fn request(&self, n: u64) {
    self.arbiter.request(n);
  }

  fn cancel(&self) {
    self.arbiter.cancel();
  }
}
