use alloc::sync::Arc;

use spin::Mutex;

use super::{subscription::Subscription, support::{add_cap, sub_or_zero}};

#[cfg(test)]
mod tests;

struct ArbiterState<T> {
  current:   Option<Arc<dyn Subscription<T>>>,
  requested: u64,
  cancelled: bool,
}

/// Subscription spanning a sequence of upstreams.
///
/// Operators that resubscribe (concat, retry, repeat, fallback
/// switching) report how many values each upstream delivered through
/// [`SubscriptionArbiter::produced`]; on switch the outstanding
/// remainder is re-issued to the new upstream so downstream demand is
/// conserved across sources. Tolerates concurrent `request`, `cancel`
/// and upstream arrival.
pub struct SubscriptionArbiter<T> {
  state: Mutex<ArbiterState<T>>,
}

impl<T: Send + 'static> SubscriptionArbiter<T> {
  /// Creates an arbiter with no upstream.
  #[must_use]
  pub fn new() -> Self {
    Self { state: Mutex::new(ArbiterState { current: None, requested: 0, cancelled: false }) }
  }

  /// Switches to the next upstream, re-issuing outstanding demand.
  ///
  /// The previous upstream, if any, is cancelled (a no-op for sources
  /// that already terminated). Returns `false` when the arbiter is
  /// cancelled; the newcomer has been cancelled in that case.
  pub fn set(&self, subscription: Arc<dyn Subscription<T>>) -> bool {
    let previous;
    let outstanding;
    {
      let mut state = self.state.lock();
      if state.cancelled {
        drop(state);
        subscription.cancel();
        return false;
      }
      previous = state.current.replace(subscription.clone());
      outstanding = state.requested;
    }
    if let Some(previous) = previous {
      previous.cancel();
    }
    if outstanding > 0 {
      subscription.request(outstanding);
    }
    true
  }

  /// Records values delivered by the current upstream, shrinking the
  /// outstanding demand that a later switch re-issues.
  pub fn produced(&self, count: u64) {
    let mut state = self.state.lock();
    if state.requested != u64::MAX {
      state.requested = sub_or_zero(state.requested, count);
    }
  }

  /// Returns `true` once cancelled.
  pub fn is_cancelled(&self) -> bool {
    self.state.lock().cancelled
  }

  /// Returns the demand not yet satisfied by any upstream.
  pub fn outstanding(&self) -> u64 {
    self.state.lock().requested
  }
}

impl<T: Send + 'static> Default for SubscriptionArbiter<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Send + 'static> Subscription<T> for SubscriptionArbiter<T> {
  fn request(&self, n: u64) {
    let target;
    {
      let mut state = self.state.lock();
      if state.cancelled {
        return;
      }
      state.requested = add_cap(state.requested, n);
      target = state.current.clone();
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
      target = state.current.take();
    }
    if let Some(upstream) = target {
      upstream.cancel();
    }
  }
}
