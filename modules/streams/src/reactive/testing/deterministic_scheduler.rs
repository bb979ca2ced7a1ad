use alloc::{sync::Arc, vec::Vec};
use core::time::Duration;

use portable_atomic::{AtomicBool, Ordering};
use spin::Mutex;

use crate::reactive::{Disposable, PeriodicTask, Scheduler, SchedulerError, Task, TaskHandle};

/// Scheduler with a hand-driven clock.
///
/// Nothing runs until the test advances time; due tasks run on the
/// advancing thread in timestamp order. Time operators become fully
/// deterministic this way.
pub struct DeterministicScheduler {
  state:    Mutex<DeterministicState>,
  disposed: AtomicBool,
}

struct DeterministicState {
  now:   Duration,
  tasks: Vec<PlannedTask>,
}

struct PlannedTask {
  at:     Duration,
  kind:   PlannedKind,
  handle: Arc<PlannedHandle>,
}

enum PlannedKind {
  Once(Option<Task>),
  Periodic { task: PeriodicTask, period: Duration },
}

struct PlannedHandle {
  disposed: AtomicBool,
}

impl Disposable for PlannedHandle {
  fn dispose(&self) {
    self.disposed.store(true, Ordering::Release);
  }

  fn is_disposed(&self) -> bool {
    self.disposed.load(Ordering::Acquire)
  }
}

impl DeterministicScheduler {
  /// Creates a scheduler at clock zero.
  #[must_use]
  pub fn new() -> Arc<Self> {
    Arc::new(Self {
      state:    Mutex::new(DeterministicState { now: Duration::ZERO, tasks: Vec::new() }),
      disposed: AtomicBool::new(false),
    })
  }

  /// Moves the clock forward, running every task that becomes due.
  pub fn advance_by(&self, delta: Duration) {
    let target = self.state.lock().now + delta;
    self.advance_to(target);
  }

  /// Runs tasks already due without moving the clock.
  pub fn run_pending(&self) {
    let target = self.state.lock().now;
    self.advance_to(target);
  }

  /// Returns the number of tasks still planned.
  #[must_use]
  pub fn planned_tasks(&self) -> usize {
    let state = self.state.lock();
    state.tasks.iter().filter(|task| !task.handle.is_disposed()).count()
  }

  fn advance_to(&self, target: Duration) {
    loop {
      let due = {
        let mut state = self.state.lock();
        state.tasks.retain(|task| !task.handle.is_disposed());
        let next = state
          .tasks
          .iter()
          .enumerate()
          .filter(|(_, task)| task.at <= target)
          .min_by_key(|(_, task)| task.at)
          .map(|(index, _)| index);
        match next {
          | Some(index) => {
            let task = state.tasks.swap_remove(index);
            state.now = state.now.max(task.at);
            Some(task)
          },
          | None => {
            state.now = state.now.max(target);
            None
          },
        }
      };
      let Some(mut planned) = due else {
        return;
      };
      match &mut planned.kind {
        | PlannedKind::Once(task) => {
          if let Some(task) = task.take() {
            task();
          }
        },
        | PlannedKind::Periodic { task, period } => {
          task();
          if !planned.handle.is_disposed() && !self.is_disposed() {
            let at = planned.at + *period;
            self.state.lock().tasks.push(PlannedTask {
              at,
              kind: PlannedKind::Periodic { task: task.clone(), period: *period },
              handle: planned.handle.clone(),
            });
          }
        },
      }
    }
  }

  fn plan(&self, at: Duration, kind: PlannedKind) -> Result<TaskHandle, SchedulerError> {
    if self.is_disposed() {
      return Err(SchedulerError::Rejected);
    }
    let handle = Arc::new(PlannedHandle { disposed: AtomicBool::new(false) });
    self.state.lock().tasks.push(PlannedTask { at, kind, handle: handle.clone() });
    Ok(handle)
  }
}

impl Scheduler for DeterministicScheduler {
  fn schedule(&self, task: Task) -> Result<TaskHandle, SchedulerError> {
    let now = self.state.lock().now;
    self.plan(now, PlannedKind::Once(Some(task)))
  }

  fn schedule_delayed(&self, task: Task, delay: Duration) -> Result<TaskHandle, SchedulerError> {
    let now = self.state.lock().now;
    self.plan(now + delay, PlannedKind::Once(Some(task)))
  }

  fn schedule_periodic(
    &self,
    task: PeriodicTask,
    initial_delay: Duration,
    period: Duration,
  ) -> Result<TaskHandle, SchedulerError> {
    let now = self.state.lock().now;
    self.plan(now + initial_delay, PlannedKind::Periodic { task, period })
  }

  fn now(&self) -> Duration {
    self.state.lock().now
  }

  fn dispose(&self) {
    self.disposed.store(true, Ordering::Release);
    self.state.lock().tasks.clear();
  }

  fn is_disposed(&self) -> bool {
    self.disposed.load(Ordering::Acquire)
  }
}
