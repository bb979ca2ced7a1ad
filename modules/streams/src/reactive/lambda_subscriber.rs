use alloc::sync::Arc;

use portable_atomic::{AtomicBool, Ordering};

use super::{
  context::Context, deferred_subscription::DeferredSubscription, disposable::Disposable, hooks,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
};

#[cfg(test)]
mod tests;

type NextFn<T> = Arc<dyn Fn(T) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(StreamError) + Send + Sync>;
type CompleteFn = Arc<dyn Fn() + Send + Sync>;

/// Closure-backed terminal subscriber.
///
/// Requests unbounded demand on subscribe and dispatches each signal
/// to the matching callback. An error arriving without an error
/// callback goes to the dropped-error hook rather than vanishing.
/// Doubles as a [`Disposable`] so callers can detach from a running
/// pipeline.
pub struct LambdaSubscriber<T: Send + 'static> {
  on_next_fn:     Option<NextFn<T>>,
  on_error_fn:    Option<ErrorFn>,
  on_complete_fn: Option<CompleteFn>,
  context:        Context,
  subscription:   DeferredSubscription<T>,
  terminated:     AtomicBool,
}

impl<T: Send + 'static> LambdaSubscriber<T> {
  /// Creates a subscriber from optional callbacks.
  #[must_use]
  pub fn new(
    on_next_fn: Option<NextFn<T>>,
    on_error_fn: Option<ErrorFn>,
    on_complete_fn: Option<CompleteFn>,
  ) -> Arc<Self> {
    Self::with_context(on_next_fn, on_error_fn, on_complete_fn, Context::empty())
  }

  /// Creates a subscriber carrying an explicit context.
  #[must_use]
  pub fn with_context(
    on_next_fn: Option<NextFn<T>>,
    on_error_fn: Option<ErrorFn>,
    on_complete_fn: Option<CompleteFn>,
    context: Context,
  ) -> Arc<Self> {
    Arc::new(Self {
      on_next_fn,
      on_error_fn,
      on_complete_fn,
      context,
      subscription: DeferredSubscription::new(),
      terminated: AtomicBool::new(false),
    })
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for LambdaSubscriber<T> {
  fn context(&self) -> Context {
    self.context.clone()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    if self.subscription.set(subscription) {
      self.subscription.request(u64::MAX);
    }
  }

  fn on_next(&self, value: T) {
    if let Some(callback) = &self.on_next_fn {
      callback(value);
    }
  }

  fn on_error(&self, error: StreamError) {
    self.terminated.store(true, Ordering::Release);
    match &self.on_error_fn {
      | Some(callback) => callback(error),
      | None => hooks::on_error_dropped(&error, &self.context),
    }
  }

  fn on_complete(&self) {
    self.terminated.store(true, Ordering::Release);
    if let Some(callback) = &self.on_complete_fn {
      callback();
    }
  }
}

impl<T: Send + 'static> Disposable for LambdaSubscriber<T> {
  fn dispose(&self) {
    self.subscription.cancel();
  }

  fn is_disposed(&self) -> bool {
    self.terminated.load(Ordering::Acquire) || self.subscription.is_cancelled()
  }
}
