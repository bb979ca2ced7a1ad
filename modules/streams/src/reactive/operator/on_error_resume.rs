use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, AtomicU64, Ordering};

use crate::reactive::{
  context::Context, flux::Flux, hooks, mono::Mono, publisher::Publisher, stream_error::StreamError,
  subscriber::CoreSubscriber, subscription::Subscription, subscription_arbiter::SubscriptionArbiter,
};

#[cfg(test)]
mod tests;

/// Switches to a recovery sequence chosen from the error.
///
/// Applied once: failures of the recovery sequence itself pass through.
pub(crate) struct OnErrorResumePublisher<T: Send + 'static> {
  source:   Arc<dyn Publisher<T>>,
  fallback: Arc<dyn Fn(&StreamError) -> Flux<T> + Send + Sync>,
}

impl<T: Send + 'static> OnErrorResumePublisher<T> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, fallback: Arc<dyn Fn(&StreamError) -> Flux<T> + Send + Sync>) -> Self {
    Self { source, fallback }
  }
}

impl<T: Send + 'static> Publisher<T> for OnErrorResumePublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    let fallback = self.fallback.clone();
    let coordinator = ResumeCoordinator::new(subscriber, Arc::new(move |error: &StreamError| (fallback)(error).raw_source()));
    coordinator.downstream.on_subscribe(coordinator.clone());
    self.source.subscribe(coordinator);
  }
}

/// `Mono` variant sharing the same coordinator.
pub(crate) struct OnErrorResumeMonoPublisher<T: Send + 'static> {
  source:   Arc<dyn Publisher<T>>,
  fallback: Arc<dyn Fn(&StreamError) -> Mono<T> + Send + Sync>,
}

impl<T: Send + 'static> OnErrorResumeMonoPublisher<T> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, fallback: Arc<dyn Fn(&StreamError) -> Mono<T> + Send + Sync>) -> Self {
    Self { source, fallback }
  }
}

impl<T: Send + 'static> Publisher<T> for OnErrorResumeMonoPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    let fallback = self.fallback.clone();
    let coordinator = ResumeCoordinator::new(subscriber, Arc::new(move |error: &StreamError| (fallback)(error).raw_source()));
    coordinator.downstream.on_subscribe(coordinator.clone());
    self.source.subscribe(coordinator);
  }
}

type FallbackFn<T> = Arc<dyn Fn(&StreamError) -> Arc<dyn Publisher<T>> + Send + Sync>;

struct ResumeCoordinator<T: Send + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<T>>,
  fallback:   FallbackFn<T>,
  arbiter:    SubscriptionArbiter<T>,
  produced:   AtomicU64,
  switched:   AtomicBool,
  done:       AtomicBool,
}

impl<T: Send + 'static> ResumeCoordinator<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<T>>, fallback: FallbackFn<T>) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      fallback,
      arbiter: SubscriptionArbiter::new(),
      produced: AtomicU64::new(0),
      switched: AtomicBool::new(false),
      done: AtomicBool::new(false),
    })
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for ResumeCoordinator<T> {
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
    if self.switched.swap(true, Ordering::AcqRel) {
      if !self.done.swap(true, Ordering::AcqRel) {
        self.downstream.on_error(error);
      }
      return;
    }
    let produced = self.produced.swap(0, Ordering::AcqRel);
    self.arbiter.produced(produced);
    let recovery = (self.fallback)(&error);
    if let Some(this) = self.weak_self.upgrade() {
      recovery.subscribe(this);
    }
  }

  fn on_complete(&self) {
    if !self.done.swap(true, Ordering::AcqRel) {
      self.downstream.on_complete();
    }
  }
}

impl<T: Send + 'static> Subscription<T> for ResumeCoordinator<T> {
  fn request(&self, n: u64) {
    self.arbiter.request(n);
  }

  fn cancel(&self) {
    self.arbiter.cancel();
  }
}
