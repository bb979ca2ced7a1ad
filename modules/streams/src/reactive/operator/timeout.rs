use alloc::{boxed::Box, sync::{Arc, Weak}};
use core::time::Duration;

use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

use crate::reactive::{
  context::Context, hooks, publisher::Publisher, scheduler::{Scheduler, TaskHandle}, stream_error::StreamError,
  subscriber::CoreSubscriber, subscription::Subscription, subscription_arbiter::SubscriptionArbiter,
};

#[cfg(test)]
mod tests;

/// Fails or falls back when the gap between signals exceeds a window.
///
/// Every inbound signal bumps an epoch counter and re-arms a one-shot
/// task; the task firing and a concurrent signal race on the epoch,
/// and only the winner proceeds. On timeout the upstream is cancelled
/// and either the timeout error is surfaced or the fallback sequence
/// takes over the remaining demand.
pub(crate) struct TimeoutPublisher<T: Send + 'static> {
  source:    Arc<dyn Publisher<T>>,
  window:    Duration,
  scheduler: Arc<dyn Scheduler>,
  fallback:  Option<Arc<dyn Publisher<T>>>,
}

impl<T: Send + 'static> TimeoutPublisher<T> {
  pub(crate) fn new(
    source: Arc<dyn Publisher<T>>,
    window: Duration,
    scheduler: Arc<dyn Scheduler>,
    fallback: Option<Arc<dyn Publisher<T>>>,
  ) -> Self {
    Self { source, window, scheduler, fallback }
  }
}

impl<T: Send + 'static> Publisher<T> for TimeoutPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    let main = TimeoutMain::new(subscriber, self.window, self.scheduler.clone(), self.fallback.clone());
    main.downstream.on_subscribe(main.clone());
    main.arm(0);
    self.source.subscribe(main);
  }
}

struct TimeoutMain<T: Send + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<T>>,
  window:     Duration,
  scheduler:  Arc<dyn Scheduler>,
  fallback:   Option<Arc<dyn Publisher<T>>>,
  arbiter:    SubscriptionArbiter<T>,
  produced:   AtomicU64,
  epoch:      AtomicU64,
  timer:      Mutex<Option<TaskHandle>>,
  switched:   AtomicBool,
  done:       AtomicBool,
}

impl<T: Send + 'static> TimeoutMain<T> {
  fn new(
    downstream: Arc<dyn CoreSubscriber<T>>,
    window: Duration,
    scheduler: Arc<dyn Scheduler>,
    fallback: Option<Arc<dyn Publisher<T>>>,
  ) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      window,
      scheduler,
      fallback,
      arbiter: SubscriptionArbiter::new(),
      produced: AtomicU64::new(0),
      epoch: AtomicU64::new(0),
      timer: Mutex::new(None),
      switched: AtomicBool::new(false),
      done: AtomicBool::new(false),
    })
  }

  fn disarm(&self) {
    if let Some(handle) = self.timer.lock().take() {
      handle.dispose();
    }
  }

  fn arm(&self, epoch: u64) {
    if self.done.load(Ordering::Acquire) || self.switched.load(Ordering::Acquire) {
      return;
    }
    let Some(weak) = self.weak_self.upgrade().map(|this| Arc::downgrade(&this)) else {
      return;
    };
    let task = Box::new(move || {
      if let Some(main) = weak.upgrade() {
        main.on_window_elapsed(epoch);
      }
    });
    match self.scheduler.schedule_delayed(task, self.window) {
      | Ok(handle) => {
        let mut timer = self.timer.lock();
        if let Some(previous) = timer.replace(handle) {
          previous.dispose();
        }
      },
      | Err(_) => {
        if !self.done.swap(true, Ordering::AcqRel) {
          self.arbiter.cancel();
          self.downstream.on_error(StreamError::SchedulerRejected);
        }
      },
    }
  }

  fn on_window_elapsed(&self, epoch: u64) {
    // Lost the race against a concurrent signal.
    if self.epoch.load(Ordering::Acquire) != epoch {
      return;
    }
    if self.done.load(Ordering::Acquire) || self.switched.swap(true, Ordering::AcqRel) {
      return;
    }
    match &self.fallback {
      | Some(fallback) => {
        let produced = self.produced.swap(0, Ordering::AcqRel);
        self.arbiter.produced(produced);
        if let Some(this) = self.weak_self.upgrade() {
          // The arbiter switch cancels the stalled upstream.
          fallback.subscribe(this);
        }
      },
      | None => {
        if !self.done.swap(true, Ordering::AcqRel) {
          self.arbiter.cancel();
          self.downstream.on_error(StreamError::Timeout { after: self.window });
        }
      },
    }
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for TimeoutMain<T> {
  fn context(&self) -> Context {
    self.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    self.arbiter.set(subscription);
  }

  fn on_next(&self, value: T) {
    if self.done.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
    self.produced.fetch_add(1, Ordering::AcqRel);
    self.downstream.on_next(value);
    if self.switched.load(Ordering::Acquire) {
      // The fallback needs no timers.
      return;
    }
    self.arm(epoch);
  }

  fn on_error(&self, error: StreamError) {
    self.epoch.fetch_add(1, Ordering::AcqRel);
    self.disarm();
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.context());
      return;
    }
    self.downstream.on_error(error);
  }

  fn on_complete(&self) {
    self.epoch.fetch_add(1, Ordering::AcqRel);
    self.disarm();
    if !self.done.swap(true, Ordering::AcqRel) {
      self.downstream.on_complete();
    }
  }
}

impl<T: Send + 'static> Subscription<T> for TimeoutMain<T> {
  fn request(&self, n: u64) {
    self.arbiter.request(n);
  }

  fn cancel(&self) {
    self.epoch.fetch_add(1, Ordering::AcqRel);
    self.disarm();
    self.arbiter.cancel();
  }
}
