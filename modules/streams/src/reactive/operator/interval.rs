use alloc::sync::Arc;
use core::time::Duration;

use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

use crate::reactive::{
  publisher::Publisher, scheduler::{Scheduler, TaskHandle}, stream_error::StreamError, subscriber::CoreSubscriber,
  subscription::Subscription, support::{add_cap_atomic, validate_demand},
};

#[cfg(test)]
mod tests;

/// Clock-driven source emitting sequential tick numbers.
///
/// Rides the external scheduler's periodic submission; a tick finding
/// zero demand is an overflow error, not a silent drop.
pub(crate) struct IntervalPublisher {
  initial_delay: Duration,
  period:        Duration,
  scheduler:     Arc<dyn Scheduler>,
}

impl IntervalPublisher {
  pub(crate) fn new(initial_delay: Duration, period: Duration, scheduler: Arc<dyn Scheduler>) -> Self {
    Self { initial_delay, period, scheduler }
  }
}

impl Publisher<u64> for IntervalPublisher {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<u64>>) {
    let state = Arc::new(IntervalState {
      downstream: subscriber.clone(),
      requested:  AtomicU64::new(0),
      ticks:      AtomicU64::new(0),
      cancelled:  AtomicBool::new(false),
      handle:     Mutex::new(None),
    });
    subscriber.on_subscribe(Arc::new(IntervalSubscription { state: state.clone() }));
    let tick_state = state.clone();
    let planned = self.scheduler.schedule_periodic(
      Arc::new(move || tick_state.tick()),
      self.initial_delay,
      self.period,
    );
    match planned {
      | Ok(handle) => {
        let mut slot = state.handle.lock();
        if state.cancelled.load(Ordering::Acquire) {
          drop(slot);
          handle.dispose();
        } else {
          *slot = Some(handle);
        }
      },
      | Err(_) => {
        if !state.cancelled.swap(true, Ordering::AcqRel) {
          state.downstream.on_error(StreamError::SchedulerRejected);
        }
      },
    }
  }
}

struct IntervalState {
  downstream: Arc<dyn CoreSubscriber<u64>>,
  requested:  AtomicU64,
  ticks:      AtomicU64,
  cancelled:  AtomicBool,
  handle:     Mutex<Option<TaskHandle>>,
}

impl IntervalState {
  fn tick(&self) {
    if self.cancelled.load(Ordering::Acquire) {
      return;
    }
    let tick = self.ticks.load(Ordering::Relaxed);
    if tick < self.requested.load(Ordering::Acquire) {
      self.ticks.store(tick + 1, Ordering::Relaxed);
      self.downstream.on_next(tick);
      return;
    }
    if !self.cancelled.swap(true, Ordering::AcqRel) {
      self.stop();
      self.downstream.on_error(StreamError::Overflow { stage: "interval" });
    }
  }

  fn stop(&self) {
    if let Some(handle) = self.handle.lock().take() {
      handle.dispose();
    }
  }
}

struct IntervalSubscription {
  state: Arc<IntervalState>,
}

impl Subscription<u64> for IntervalSubscription {
  fn request(&self, n: u64) {
    if let Err(error) = validate_demand(n) {
      if !self.state.cancelled.swap(true, Ordering::AcqRel) {
        self.state.stop();
        self.state.downstream.on_error(error);
      }
      return;
    }
    add_cap_atomic(&self.state.requested, n);
  }

  fn cancel(&self) {
    if !self.state.cancelled.swap(true, Ordering::AcqRel) {
      self.state.stop();
    }
  }
}
