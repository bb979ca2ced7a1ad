use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, Ordering};

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, publisher::Publisher, stream_error::StreamError,
  subscriber::CoreSubscriber, subscription::Subscription,
};

#[cfg(test)]
mod tests;

/// How a sequence reached its end, as observed by `do_finally`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinallyKind {
  /// The sequence completed normally.
  Complete,
  /// The sequence failed.
  Error,
  /// The downstream cancelled.
  Cancel,
}

type FinallyFn = Arc<dyn Fn(FinallyKind) + Send + Sync>;

/// Terminal observation running exactly once, after the terminal
/// handler itself.
pub(crate) struct DoFinallyPublisher<T: Send + 'static> {
  source:   Arc<dyn Publisher<T>>,
  callback: FinallyFn,
}

impl<T: Send + 'static> DoFinallyPublisher<T> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, callback: FinallyFn) -> Self {
    Self { source, callback }
  }
}

impl<T: Send + 'static> Publisher<T> for DoFinallyPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    self.source.subscribe(DoFinallySubscriber::new(subscriber, self.callback.clone()));
  }
}

struct DoFinallySubscriber<T: Send + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<T>>,
  callback:   FinallyFn,
  upstream:   DeferredSubscription<T>,
  once:       AtomicBool,
}

impl<T: Send + 'static> DoFinallySubscriber<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<T>>, callback: FinallyFn) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      callback,
      upstream: DeferredSubscription::new(),
      once: AtomicBool::new(false),
    })
  }

  fn run_once(&self, kind: FinallyKind) {
    if !self.once.swap(true, Ordering::AcqRel) {
      (self.callback)(kind);
    }
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for DoFinallySubscriber<T> {
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
    self.downstream.on_next(value);
  }

  fn on_error(&self, error: StreamError) {
    self.downstream.on_error(error);
    self.run_once(FinallyKind::Error);
  }

  fn on_complete(&self) {
    self.downstream.on_complete();
    self.run_once(FinallyKind::Complete);
  }
}

impl<T: Send + 'static> Subscription<T> for DoFinallySubscriber<T> {
  fn request(&self, n: u64) {
    self.upstream.request(n);
  }

  fn cancel(&self) {
    self.upstream.cancel();
    self.run_once(FinallyKind::Cancel);
  }
}
