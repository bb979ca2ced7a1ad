use alloc::sync::Arc;

use portable_atomic::{AtomicU8, Ordering};
use spin::Mutex;

use super::{
  fusion::FusionMode, hooks, stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
  support::validate_demand,
};

#[cfg(test)]
mod tests;

const IDLE: u8 = 0;
const CLAIMED: u8 = 1;
const CANCELLED: u8 = 2;

/// Subscription delivering exactly one already-known value.
///
/// Backs the scalar sources and the single-value terminals. Grants
/// `SYNC` fusion: a fused downstream polls the value out directly and
/// never sees `on_next`.
pub struct ScalarSubscription<T> {
  value:      Mutex<Option<T>>,
  state:      AtomicU8,
  downstream: Arc<dyn CoreSubscriber<T>>,
}

impl<T: Send + 'static> ScalarSubscription<T> {
  /// Creates the subscription; the caller hands it to `on_subscribe`.
  #[must_use]
  pub fn new(downstream: Arc<dyn CoreSubscriber<T>>, value: T) -> Self {
    Self { value: Mutex::new(Some(value)), state: AtomicU8::new(IDLE), downstream }
  }

  fn claim(&self) -> Option<T> {
    if self.state.compare_exchange(IDLE, CLAIMED, Ordering::AcqRel, Ordering::Acquire).is_err() {
      return None;
    }
    self.value.lock().take()
  }
}

impl<T: Send + 'static> Subscription<T> for ScalarSubscription<T> {
  fn request(&self, n: u64) {
    if let Err(error) = validate_demand(n) {
      if let Some(value) = self.claim() {
        hooks::on_discard(value, &self.downstream.context());
      }
      self.downstream.on_error(error);
      return;
    }
    if let Some(value) = self.claim() {
      self.downstream.on_next(value);
      if self.state.load(Ordering::Acquire) != CANCELLED {
        self.downstream.on_complete();
      }
    }
  }

  fn cancel(&self) {
    let previous = self.state.swap(CANCELLED, Ordering::AcqRel);
    if previous == IDLE {
      if let Some(value) = self.value.lock().take() {
        hooks::on_discard(value, &self.downstream.context());
      }
    }
  }

  fn request_fusion(&self, mask: FusionMode) -> FusionMode {
    if mask.allows_sync() {
      FusionMode::SYNC
    } else {
      FusionMode::NONE
    }
  }

  fn poll(&self) -> Result<Option<T>, StreamError> {
    Ok(self.claim())
  }

  fn is_poll_empty(&self) -> bool {
    self.state.load(Ordering::Acquire) != IDLE || self.value.lock().is_none()
  }

  fn poll_len(&self) -> usize {
    usize::from(!self.is_poll_empty())
  }

  fn clear_poll(&self) {
    self.cancel();
  }
}
