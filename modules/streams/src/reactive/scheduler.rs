use alloc::{boxed::Box, sync::Arc};
use core::{fmt, time::Duration};

use super::disposable::Disposable;

/// One-shot unit of work handed to a scheduler.
pub type Task = Box<dyn FnOnce() + Send>;
/// Repeating unit of work handed to a scheduler.
pub type PeriodicTask = Arc<dyn Fn() + Send + Sync>;
/// Cancellation handle for a scheduled task.
pub type TaskHandle = Arc<dyn Disposable>;

/// Errors raised by a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
  /// The scheduler is disposed and accepts no further work.
  Rejected,
}

impl fmt::Display for SchedulerError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::Rejected => write!(f, "scheduler rejected the task"),
    }
  }
}

impl core::error::Error for SchedulerError {}

/// Executor abstraction consumed by time-based operators.
///
/// The core performs no threading of its own: `interval`, `timeout`
/// and friends only submit work here and cancel the returned handles.
pub trait Scheduler: Send + Sync {
  /// Submits a task for immediate execution.
  ///
  /// # Errors
  ///
  /// Returns [`SchedulerError::Rejected`] when the scheduler is
  /// disposed.
  fn schedule(&self, task: Task) -> Result<TaskHandle, SchedulerError>;

  /// Submits a task to run after a delay.
  ///
  /// # Errors
  ///
  /// Returns [`SchedulerError::Rejected`] when the scheduler is
  /// disposed.
  fn schedule_delayed(&self, task: Task, delay: Duration) -> Result<TaskHandle, SchedulerError>;

  /// Submits a task to run periodically after an initial delay.
  ///
  /// # Errors
  ///
  /// Returns [`SchedulerError::Rejected`] when the scheduler is
  /// disposed.
  fn schedule_periodic(
    &self,
    task: PeriodicTask,
    initial_delay: Duration,
    period: Duration,
  ) -> Result<TaskHandle, SchedulerError>;

  /// Returns the scheduler clock reading.
  fn now(&self) -> Duration;

  /// Disposes the scheduler; pending tasks are dropped.
  fn dispose(&self);

  /// Returns `true` once disposed.
  fn is_disposed(&self) -> bool;
}
