extern crate std;

use alloc::sync::Arc;
use core::time::Duration;
use std::time::Instant;

use portable_atomic::{AtomicBool, Ordering};

use crate::reactive::{Disposable, PeriodicTask, Scheduler, SchedulerError, Task, TaskHandle};

#[cfg(test)]
mod tests;

/// Scheduler running tasks on the ambient tokio runtime.
///
/// Construction requires a reachable runtime handle; scheduling on a
/// disposed instance is rejected and surfaced by the calling operator
/// as a downstream error.
pub struct TokioScheduler {
  handle:   tokio::runtime::Handle,
  epoch:    Instant,
  disposed: AtomicBool,
}

impl TokioScheduler {
  /// Creates a scheduler bound to the current tokio runtime.
  ///
  /// # Errors
  ///
  /// Returns [`SchedulerError::Rejected`] when no runtime is running.
  pub fn current() -> Result<Arc<Self>, SchedulerError> {
    let handle = tokio::runtime::Handle::try_current().map_err(|_| {
      tracing::warn!("no tokio runtime available for scheduler");
      SchedulerError::Rejected
    })?;
    Ok(Arc::new(Self { handle, epoch: Instant::now(), disposed: AtomicBool::new(false) }))
  }

  fn guard(&self) -> Result<(), SchedulerError> {
    if self.is_disposed() {
      tracing::warn!("task rejected: scheduler disposed");
      return Err(SchedulerError::Rejected);
    }
    Ok(())
  }
}

struct AbortHandle {
  inner:    tokio::task::AbortHandle,
  disposed: AtomicBool,
}

impl Disposable for AbortHandle {
  fn dispose(&self) {
    if !self.disposed.swap(true, Ordering::AcqRel) {
      self.inner.abort();
    }
  }

  fn is_disposed(&self) -> bool {
    self.disposed.load(Ordering::Acquire)
  }
}

impl Scheduler for TokioScheduler {
  fn schedule(&self, task: Task) -> Result<TaskHandle, SchedulerError> {
    self.guard()?;
    let join = self.handle.spawn(async move { task() });
    Ok(Arc::new(AbortHandle { inner: join.abort_handle(), disposed: AtomicBool::new(false) }))
  }

  fn schedule_delayed(&self, task: Task, delay: Duration) -> Result<TaskHandle, SchedulerError> {
    self.guard()?;
    let join = self.handle.spawn(async move {
      tokio::time::sleep(delay).await;
      task();
    });
    Ok(Arc::new(AbortHandle { inner: join.abort_handle(), disposed: AtomicBool::new(false) }))
  }

  fn schedule_periodic(
    &self,
    task: PeriodicTask,
    initial_delay: Duration,
    period: Duration,
  ) -> Result<TaskHandle, SchedulerError> {
    self.guard()?;
    let join = self.handle.spawn(async move {
      tokio::time::sleep(initial_delay).await;
      loop {
        task();
        tokio::time::sleep(period).await;
      }
    });
    Ok(Arc::new(AbortHandle { inner: join.abort_handle(), disposed: AtomicBool::new(false) }))
  }

  fn now(&self) -> Duration {
    self.epoch.elapsed()
  }

  fn dispose(&self) {
    self.disposed.store(true, Ordering::Release);
  }

  fn is_disposed(&self) -> bool {
    self.disposed.load(Ordering::Acquire)
  }
}
