use alloc::sync::Arc;
use core::time::Duration;

use super::{
  flux::Flux,
  lambda_subscriber::LambdaSubscriber,
  operator::{
    defer::DeferMonoPublisher, empty::EmptyPublisher, error_source::ErrorPublisher, from_fn::CallablePublisher,
    just::JustPublisher, map::MapPublisher, on_error_resume::OnErrorResumeMonoPublisher, retry::RetryPublisher,
    then::ThenPublisher, timeout::TimeoutPublisher, try_map::TryMapPublisher,
  },
  publisher::Publisher,
  scheduler::Scheduler,
  stream_error::StreamError,
  subscriber::CoreSubscriber,
};

#[cfg(test)]
mod tests;

/// Handle on a sequence of at most one value.
///
/// Shares the protocol and most operator machinery with [`Flux`]; the
/// cardinality bound is a construction-time guarantee, not a separate
/// contract.
pub struct Mono<T: Send + 'static> {
  source: Arc<dyn Publisher<T>>,
}

impl<T: Send + 'static> Clone for Mono<T> {
  fn clone(&self) -> Self {
    Self { source: self.source.clone() }
  }
}

impl<T: Send + 'static> Mono<T> {
  /// Wraps an existing at-most-one-value publisher.
  #[must_use]
  pub fn from_publisher(source: Arc<dyn Publisher<T>>) -> Self {
    Self { source }
  }

  pub(crate) fn from_operator<P>(publisher: P) -> Self
  where
    P: Publisher<T> + 'static, {
    Self { source: Arc::new(publisher) }
  }

  pub(crate) fn raw_source(&self) -> Arc<dyn Publisher<T>> {
    self.source.clone()
  }

  /// Emits the value, then completes.
  #[must_use]
  pub fn just(value: T) -> Self
  where
    T: Clone + Sync, {
    Self::from_operator(JustPublisher::new(value))
  }

  /// Completes immediately without a value.
  #[must_use]
  pub fn empty() -> Self {
    Self::from_operator(EmptyPublisher::new())
  }

  /// Fails immediately.
  #[must_use]
  pub fn error(error: StreamError) -> Self {
    Self::from_operator(ErrorPublisher::new(Arc::new(move || error.clone())))
  }

  /// Produces the value through a callable at subscribe time.
  #[must_use]
  pub fn from_fn<F>(callable: F) -> Self
  where
    F: Fn() -> Result<Option<T>, StreamError> + Send + Sync + 'static, {
    Self::from_operator(CallablePublisher::new(Arc::new(callable)))
  }

  /// Builds the actual `Mono` lazily at subscribe time.
  #[must_use]
  pub fn defer<F>(supplier: F) -> Self
  where
    F: Fn() -> Self + Send + Sync + 'static, {
    Self::from_operator(DeferMonoPublisher::new(Arc::new(supplier)))
  }

  /// Transforms the value.
  #[must_use]
  pub fn map<R, F>(self, mapper: F) -> Mono<R>
  where
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static, {
    Mono::from_operator(MapPublisher::new(self.source, Arc::new(mapper)))
  }

  /// Transforms the value through a fallible mapper.
  #[must_use]
  pub fn try_map<R, F>(self, mapper: F) -> Mono<R>
  where
    R: Send + 'static,
    F: Fn(&T) -> Result<R, StreamError> + Send + Sync + 'static, {
    Mono::from_operator(TryMapPublisher::new(self.source, Arc::new(mapper)))
  }

  /// Ignores this value and continues with the next sequence after
  /// completion.
  #[must_use]
  pub fn then<R>(self, next: Mono<R>) -> Mono<R>
  where
    R: Send + 'static, {
    Mono::from_operator(ThenPublisher::new(self.source, next.source))
  }

  /// Switches to a recovery `Mono` chosen from the error.
  #[must_use]
  pub fn on_error_resume<F>(self, fallback: F) -> Self
  where
    F: Fn(&StreamError) -> Self + Send + Sync + 'static, {
    Self::from_operator(OnErrorResumeMonoPublisher::new(self.source, Arc::new(fallback)))
  }

  /// Resubscribes up to `attempts` times after a failure.
  #[must_use]
  pub fn retry(self, attempts: u64) -> Self {
    Self::from_operator(RetryPublisher::new(self.source, attempts, None))
  }

  /// Fails with a timeout error when no signal arrives in the window.
  #[must_use]
  pub fn timeout(self, window: Duration, scheduler: Arc<dyn Scheduler>) -> Self {
    Self::from_operator(TimeoutPublisher::new(self.source, window, scheduler, None))
  }

  /// Widens this sequence to a [`Flux`].
  #[must_use]
  pub fn flux(self) -> Flux<T> {
    Flux::from_publisher(self.source)
  }

  /// Subscribes the given subscriber.
  pub fn subscribe_with(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    self.source.subscribe(subscriber);
  }

  /// Subscribes with a value callback and unbounded demand.
  pub fn subscribe<F>(&self, on_next: F) -> Arc<LambdaSubscriber<T>>
  where
    F: Fn(T) + Send + Sync + 'static, {
    let subscriber = LambdaSubscriber::new(Some(Arc::new(on_next)), None, None);
    self.subscribe_with(subscriber.clone());
    subscriber
  }
}
