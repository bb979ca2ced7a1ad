use alloc::sync::Arc;

use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

use crate::reactive::{
  support::{add_cap_atomic, EmptySubscription},
  CoreSubscriber, Publisher, StreamError, Subscription,
};

/// Hand-driven publisher for protocol tests.
///
/// Emission is scripted from the test body; the publisher records the
/// demand and cancellation state its subscriber produces so tests can
/// assert the sink side of the protocol. A misbehaving helper is
/// provided to exercise double-`on_subscribe` handling.
pub struct TestPublisher<T: Send + 'static> {
  shared: Arc<TestPublisherShared<T>>,
}

struct TestPublisherShared<T: Send + 'static> {
  subscriber: Mutex<Option<Arc<dyn CoreSubscriber<T>>>>,
  requested:  AtomicU64,
  cancelled:  AtomicBool,
}

struct TestPublisherSubscription<T: Send + 'static> {
  shared: Arc<TestPublisherShared<T>>,
}

impl<T: Send + 'static> TestPublisher<T> {
  /// Creates an idle publisher.
  #[must_use]
  pub fn new() -> Arc<Self> {
    Arc::new(Self {
      shared: Arc::new(TestPublisherShared {
        subscriber: Mutex::new(None),
        requested:  AtomicU64::new(0),
        cancelled:  AtomicBool::new(false),
      }),
    })
  }

  /// Emits one value to the current subscriber.
  pub fn emit(&self, value: T) {
    let subscriber = self.shared.subscriber.lock().clone();
    if let Some(subscriber) = subscriber {
      subscriber.on_next(value);
    }
  }

  /// Completes the current subscriber.
  pub fn complete(&self) {
    let subscriber = self.shared.subscriber.lock().clone();
    if let Some(subscriber) = subscriber {
      subscriber.on_complete();
    }
  }

  /// Fails the current subscriber.
  pub fn fail(&self, error: StreamError) {
    let subscriber = self.shared.subscriber.lock().clone();
    if let Some(subscriber) = subscriber {
      subscriber.on_error(error);
    }
  }

  /// Sends a second, protocol-violating `on_subscribe`.
  pub fn double_on_subscribe(&self) {
    let subscriber = self.shared.subscriber.lock().clone();
    if let Some(subscriber) = subscriber {
      subscriber.on_subscribe(Arc::new(EmptySubscription));
    }
  }

  /// Returns the demand requested so far.
  #[must_use]
  pub fn requested_demand(&self) -> u64 {
    self.shared.requested.load(Ordering::Acquire)
  }

  /// Returns `true` once the subscriber cancelled.
  #[must_use]
  pub fn is_cancelled(&self) -> bool {
    self.shared.cancelled.load(Ordering::Acquire)
  }

  /// Returns `true` while a subscriber is attached.
  #[must_use]
  pub fn has_subscriber(&self) -> bool {
    self.shared.subscriber.lock().is_some()
  }
}

impl<T: Send + 'static> Publisher<T> for TestPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    *self.shared.subscriber.lock() = Some(subscriber.clone());
    subscriber.on_subscribe(Arc::new(TestPublisherSubscription { shared: self.shared.clone() }));
  }
}

impl<T: Send + 'static> Subscription<T> for TestPublisherSubscription<T> {
  fn request(&self, n: u64) {
    add_cap_atomic(&self.shared.requested, n);
  }

  fn cancel(&self) {
    self.shared.cancelled.store(true, Ordering::Release);
  }
}
