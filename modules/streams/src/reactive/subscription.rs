use super::{fusion::FusionMode, stream_error::StreamError};

/// Link between one subscriber and its upstream producer.
///
/// `request` and `cancel` may be called from any thread; producers
/// guard their state with atomics accordingly. The remaining methods
/// form the queue-subscription fusion surface and keep refusing
/// defaults so ordinary subscriptions opt out without boilerplate.
pub trait Subscription<T>: Send + Sync {
  /// Adds demand; accumulates and saturates at `u64::MAX`, which acts
  /// as the unbounded sentinel. Zero demand is a protocol error the
  /// producer reports through `on_error`.
  fn request(&self, n: u64);

  /// Stops the subscription; idempotent, and after it returns the
  /// producer discards anything it can no longer deliver.
  fn cancel(&self);

  /// Negotiates a fusion mode; the answer is `NONE` or a subset of the
  /// request.
  fn request_fusion(&self, _mask: FusionMode) -> FusionMode {
    FusionMode::NONE
  }

  /// Takes the next fused value.
  ///
  /// In `SYNC` mode `Ok(None)` is the terminal; in `ASYNC` mode it
  /// only means the queue is momentarily empty.
  ///
  /// # Errors
  ///
  /// Returns the upstream failure in `SYNC` mode when production
  /// fails mid-poll.
  fn poll(&self) -> Result<Option<T>, StreamError> {
    Ok(None)
  }

  /// Returns `true` when a fused `poll` would find nothing.
  fn is_poll_empty(&self) -> bool {
    true
  }

  /// Returns the number of fused values ready to poll.
  fn poll_len(&self) -> usize {
    0
  }

  /// Drops every fused value still queued.
  fn clear_poll(&self) {}
}
