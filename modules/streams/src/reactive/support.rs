use alloc::sync::Arc;

use portable_atomic::{AtomicU64, Ordering};

use super::{stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription};

#[cfg(test)]
mod tests;

/// Saturating demand addition; `u64::MAX` is the unbounded sentinel.
#[must_use]
pub const fn add_cap(a: u64, b: u64) -> u64 {
  a.saturating_add(b)
}

/// Saturating demand subtraction, floored at zero.
#[must_use]
pub const fn sub_or_zero(a: u64, b: u64) -> u64 {
  a.saturating_sub(b)
}

/// Atomically adds demand to a counter with saturation.
///
/// Returns the previous value; a previous value of zero tells the
/// caller it owns the newly arrived demand. Once the counter reads
/// `u64::MAX` it never moves again, so unbounded pipelines skip the
/// bookkeeping entirely.
pub fn add_cap_atomic(counter: &AtomicU64, n: u64) -> u64 {
  let mut current = counter.load(Ordering::Relaxed);
  loop {
    if current == u64::MAX {
      return u64::MAX;
    }
    let next = current.saturating_add(n);
    match counter.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
      | Ok(previous) => return previous,
      | Err(actual) => current = actual,
    }
  }
}

/// Atomically subtracts delivered items from a demand counter and
/// returns the remaining demand.
///
/// A counter at the unbounded sentinel is left untouched.
pub fn produced(counter: &AtomicU64, n: u64) -> u64 {
  let mut current = counter.load(Ordering::Relaxed);
  loop {
    if current == u64::MAX {
      return u64::MAX;
    }
    let next = current.saturating_sub(n);
    match counter.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
      | Ok(_) => return next,
      | Err(actual) => current = actual,
    }
  }
}

/// Checks a requested demand amount.
///
/// # Errors
///
/// Returns [`StreamError::InvalidDemand`] when `n` is zero; the caller
/// delivers it through `on_error`.
pub const fn validate_demand(n: u64) -> Result<(), StreamError> {
  if n == 0 {
    return Err(StreamError::InvalidDemand { requested: n });
  }
  Ok(())
}

/// Subscription that never produces; used ahead of an immediate
/// terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptySubscription;

impl<T> Subscription<T> for EmptySubscription {
  fn request(&self, _n: u64) {}

  fn cancel(&self) {}
}

/// Delivers a lone completion after an inert `on_subscribe`.
pub fn complete_only<T>(subscriber: &Arc<dyn CoreSubscriber<T>>) {
  subscriber.on_subscribe(Arc::new(EmptySubscription));
  subscriber.on_complete();
}

/// Delivers a lone failure after an inert `on_subscribe`.
pub fn error_only<T>(subscriber: &Arc<dyn CoreSubscriber<T>>, error: StreamError) {
  subscriber.on_subscribe(Arc::new(EmptySubscription));
  subscriber.on_error(error);
}
