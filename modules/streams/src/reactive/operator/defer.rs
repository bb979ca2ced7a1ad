use alloc::sync::Arc;

use crate::reactive::{flux::Flux, mono::Mono, publisher::Publisher, subscriber::CoreSubscriber};

/// Source building the actual sequence per subscriber.
pub(crate) struct DeferPublisher<T: Send + 'static> {
  supplier: Arc<dyn Fn() -> Flux<T> + Send + Sync>,
}

impl<T: Send + 'static> DeferPublisher<T> {
  pub(crate) fn new(supplier: Arc<dyn Fn() -> Flux<T> + Send + Sync>) -> Self {
    Self { supplier }
  }
}

impl<T: Send + 'static> Publisher<T> for DeferPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    (self.supplier)().subscribe_with(subscriber);
  }
}

/// `Mono` variant of [`DeferPublisher`].
pub(crate) struct DeferMonoPublisher<T: Send + 'static> {
  supplier: Arc<dyn Fn() -> Mono<T> + Send + Sync>,
}

impl<T: Send + 'static> DeferMonoPublisher<T> {
  pub(crate) fn new(supplier: Arc<dyn Fn() -> Mono<T> + Send + Sync>) -> Self {
    Self { supplier }
  }
}

impl<T: Send + 'static> Publisher<T> for DeferMonoPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    (self.supplier)().subscribe_with(subscriber);
  }
}
