use alloc::sync::Arc;

use super::subscriber::CoreSubscriber;

/// Immutable, re-subscribable source of a sequence.
///
/// A publisher owns only its construction-time parameters; every
/// `subscribe` call installs a fresh subscriber chain. Publishers are
/// freely shared across threads and subscribe calls.
pub trait Publisher<T>: Send + Sync {
  /// Starts a new subscription for the given subscriber.
  ///
  /// The implementation must call
  /// [`CoreSubscriber::on_subscribe`] exactly once before any other
  /// signal.
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>);
}
