use alloc::sync::Arc;

use spin::Mutex;

use super::{stream_error::StreamError, subscription::Subscription, support::{add_cap, validate_demand}};


struct DeferredState<T> {
  upstream:  Option<Arc<dyn Subscription<T>>>,
  requested: u64,
  cancelled: bool,
}

/// Subscription whose upstream arrives later than its demand.
///
/// Demand accumulates with saturation until the upstream is set, at
/// which point the pending amount is drained into it atomically.
/// Cancellation is idempotent and doubles as the cancelled sentinel:
/// an upstream arriving after `cancel` is cancelled immediately.
pub struct DeferredSubscription<T> {
  state: Mutex<DeferredState<T>>,
}

impl<T: Send + 'static> DeferredSubscription<T> {
  /// Creates a subscription with no upstream and no demand.
  #[must_use]
  pub fn new() -> Self {
    Self { state: Mutex::new(DeferredState { upstream: None, requested: 0, cancelled: false }) }
  }

  /// Installs the upstream, draining any pending demand into it.
  ///
  /// Returns `false` when the upstream was refused: either this
  /// subscription is cancelled or an upstream is already set. The
  /// refused subscription has been cancelled when this returns.
  pub fn set(&self, subscription: Arc<dyn Subscription<T>>) -> bool {
    let pending;
    {
      let mut state = self.state.lock();
      if state.cancelled || state.upstream.is_some() {
        drop(state);
        subscription.cancel();
        return false;
      }
      pending = state.requested;
      state.requested = 0;
      state.upstream = Some(subscription.clone());
    }
    if pending > 0 {
      subscription.request(pending);
    }
    true
  }

  /// Returns `true` once cancelled.
  pub fn is_cancelled(&self) -> bool {
    self.state.lock().cancelled
  }

  /// Returns the upstream, if one is set; fusion negotiation reaches
  /// through here.
  pub fn current(&self) -> Option<Arc<dyn Subscription<T>>> {
    self.state.lock().upstream.clone()
  }

  /// Returns the demand accumulated while no upstream was set.
  pub fn pending_demand(&self) -> u64 {
    self.state.lock().requested
  }

  /// Checks a demand amount before forwarding.
  ///
  /// # Errors
  ///
  /// Returns [`StreamError::InvalidDemand`] for zero demand.
  pub const fn validate(n: u64) -> Result<(), StreamError> {
    validate_demand(n)
  }
}

impl<T: Send + 'static> Default for DeferredSubscription<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Send + 'static> Subscription<T> for DeferredSubscription<T> {
  fn request(&self, n: u64) {
    let target;
    {
      let mut state = self.state.lock();
      if state.cancelled {
        return;
      }
      match &state.upstream {
        | Some(upstream) => target = Some(upstream.clone()),
        | None => {
          state.requested = add_cap(state.requested, n);
          target = None;
        },
      }
    }
    if let Some(upstream) = target {
      upstream.request(n);
    }
  }

  fn cancel(&self) {
    let target;
    {
      let mut state = self.state.lock();
      if state.cancelled {
        return;
      }
      state.cancelled = true;
      target = state.upstream.take();
    }
    if let Some(upstream) = target {
      upstream.cancel();
    }
  }
}
