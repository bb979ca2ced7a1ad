use alloc::{sync::Arc, vec::Vec};

use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use spin::Mutex;

use crate::reactive::{
  hooks::{context_with_discard_hook, context_with_error_dropped_hook, context_with_next_dropped_hook},
  Context, CoreSubscriber, DeferredSubscription, StreamError, Subscription,
};

/// Demand-aware probe recording everything a pipeline delivers to it.
///
/// Also wires recording discard / dropped-value / dropped-error hooks
/// into its context, so protocol edge cases are assertable without
/// touching the global hook table.
pub struct TestSubscriber<T: Send + 'static> {
  subscription:    DeferredSubscription<T>,
  initial_demand:  u64,
  received:        Arc<Mutex<Vec<T>>>,
  discarded:       Arc<Mutex<Vec<T>>>,
  dropped_values:  Arc<Mutex<Vec<T>>>,
  dropped_errors:  Arc<Mutex<Vec<StreamError>>>,
  error:           Mutex<Option<StreamError>>,
  completed:       AtomicBool,
  subscribe_calls: AtomicUsize,
}

impl<T: Send + 'static> TestSubscriber<T> {
  /// Creates a probe that requests nothing on subscribe.
  #[must_use]
  pub fn new() -> Arc<Self> {
    Self::with_demand(0)
  }

  /// Creates a probe that requests `demand` as soon as it is
  /// subscribed.
  #[must_use]
  pub fn with_demand(demand: u64) -> Arc<Self> {
    Arc::new(Self {
      subscription:    DeferredSubscription::new(),
      initial_demand:  demand,
      received:        Arc::new(Mutex::new(Vec::new())),
      discarded:       Arc::new(Mutex::new(Vec::new())),
      dropped_values:  Arc::new(Mutex::new(Vec::new())),
      dropped_errors:  Arc::new(Mutex::new(Vec::new())),
      error:           Mutex::new(None),
      completed:       AtomicBool::new(false),
      subscribe_calls: AtomicUsize::new(0),
    })
  }

  /// Requests more demand from the upstream.
  pub fn request(&self, n: u64) {
    self.subscription.request(n);
  }

  /// Cancels the upstream subscription.
  pub fn cancel(&self) {
    self.subscription.cancel();
  }

  /// Returns the installed upstream subscription, for tests that talk
  /// to the fusion surface directly.
  #[must_use]
  pub fn upstream(&self) -> Option<Arc<dyn Subscription<T>>> {
    self.subscription.current()
  }

  /// Returns a snapshot of the received values.
  #[must_use]
  pub fn received(&self) -> Vec<T>
  where
    T: Clone, {
    self.received.lock().clone()
  }

  /// Returns the number of received values.
  #[must_use]
  pub fn received_count(&self) -> usize {
    self.received.lock().len()
  }

  /// Returns a snapshot of the values handed to the discard hook.
  #[must_use]
  pub fn discarded(&self) -> Vec<T>
  where
    T: Clone, {
    self.discarded.lock().clone()
  }

  /// Returns a snapshot of the values handed to the dropped hook.
  #[must_use]
  pub fn dropped_values(&self) -> Vec<T>
  where
    T: Clone, {
    self.dropped_values.lock().clone()
  }

  /// Returns a snapshot of the errors handed to the dropped hook.
  #[must_use]
  pub fn dropped_errors(&self) -> Vec<StreamError> {
    self.dropped_errors.lock().clone()
  }

  /// Returns the terminal error, if one arrived.
  #[must_use]
  pub fn error(&self) -> Option<StreamError> {
    self.error.lock().clone()
  }

  /// Returns `true` once completion arrived.
  #[must_use]
  pub fn is_completed(&self) -> bool {
    self.completed.load(Ordering::Acquire)
  }

  /// Returns `true` once either terminal arrived.
  #[must_use]
  pub fn is_terminated(&self) -> bool {
    self.is_completed() || self.error.lock().is_some()
  }

  /// Returns how many times `on_subscribe` was attempted.
  #[must_use]
  pub fn subscribe_calls(&self) -> usize {
    self.subscribe_calls.load(Ordering::Acquire)
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for TestSubscriber<T> {
  fn context(&self) -> Context {
    let discarded = self.discarded.clone();
    let dropped_values = self.dropped_values.clone();
    let dropped_errors = self.dropped_errors.clone();
    let context = context_with_discard_hook(
      &Context::empty(),
      Arc::new(move |value| {
        if let Ok(value) = value.downcast::<T>() {
          discarded.lock().push(*value);
        }
      }),
    );
    let context = context_with_next_dropped_hook(
      &context,
      Arc::new(move |value| {
        if let Ok(value) = value.downcast::<T>() {
          dropped_values.lock().push(*value);
        }
      }),
    );
    context_with_error_dropped_hook(&context, Arc::new(move |error| dropped_errors.lock().push(error.clone())))
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    self.subscribe_calls.fetch_add(1, Ordering::AcqRel);
    if self.subscription.set(subscription) && self.initial_demand > 0 {
      self.subscription.request(self.initial_demand);
    }
  }

  fn on_next(&self, value: T) {
    self.received.lock().push(value);
  }

  fn on_error(&self, error: StreamError) {
    *self.error.lock() = Some(error);
  }

  fn on_complete(&self) {
    self.completed.store(true, Ordering::Release);
  }
}
