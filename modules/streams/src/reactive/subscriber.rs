use alloc::sync::Arc;

use super::{context::Context, stream_error::StreamError, subscription::Subscription};

/// Consumer side of the protocol.
///
/// Signals arrive serially: `on_subscribe` exactly once first, then
/// zero or more `on_next`, then at most one terminal. All methods take
/// `&self`; implementations carry their state behind atomics so one
/// instance can serve as both a subscriber and the subscription it
/// hands further downstream.
pub trait CoreSubscriber<T>: Send + Sync {
  /// Returns the subscription context, propagated toward the source.
  fn context(&self) -> Context {
    Context::empty()
  }

  /// Installs the upstream subscription.
  ///
  /// A second call on a subscriber whose subscription is already set
  /// must cancel the newcomer.
  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>);

  /// Delivers one value.
  fn on_next(&self, value: T);

  /// Conditional delivery: returns `false` when the value was refused
  /// without consuming demand. The default path accepts via
  /// [`CoreSubscriber::on_next`].
  fn try_on_next(&self, value: T) -> bool {
    self.on_next(value);
    true
  }

  /// Returns `true` when [`CoreSubscriber::try_on_next`] carries real
  /// refusal semantics, letting producers skip demand bookkeeping for
  /// refused values.
  fn is_conditional(&self) -> bool {
    false
  }

  /// Async-fusion wake: values are ready to `poll`. Only delivered
  /// after the subscriber negotiated `ASYNC` fusion.
  fn on_poll_ready(&self) {}

  /// Delivers the failure terminal.
  fn on_error(&self, error: StreamError);

  /// Delivers the completion terminal.
  fn on_complete(&self);
}
