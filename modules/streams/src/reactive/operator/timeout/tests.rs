use alloc::vec;
use core::time::Duration;

use crate::reactive::{testing::{DeterministicScheduler, TestPublisher, TestSubscriber}, Flux, Scheduler, StreamError};

const WINDOW: Duration = Duration::from_millis(10);

#[test]
fn quiet_sources_time_out() {
  let scheduler = DeterministicScheduler::new();
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone()).timeout(WINDOW, scheduler.clone()).subscribe_with(probe.clone());
  scheduler.advance_by(WINDOW);
  assert!(matches!(probe.error(), Some(StreamError::Timeout { .. })));
  assert!(source.is_cancelled());
}

#[test]
fn each_signal_rearms_the_window() {
  let scheduler = DeterministicScheduler::new();
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone()).timeout(WINDOW, scheduler.clone()).subscribe_with(probe.clone());
  scheduler.advance_by(Duration::from_millis(7));
  source.emit(1);
  scheduler.advance_by(Duration::from_millis(7));
  source.emit(2);
  scheduler.advance_by(Duration::from_millis(7));
  assert_eq!(probe.received(), [1, 2]);
  assert!(probe.error().is_none());
  scheduler.advance_by(Duration::from_millis(3));
  assert!(matches!(probe.error(), Some(StreamError::Timeout { .. })));
}

#[test]
fn fallback_takes_over_without_leaking_timers() {
  let scheduler = DeterministicScheduler::new();
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone())
    .timeout_or(WINDOW, scheduler.clone(), Flux::from_vec(vec![99]))
    .subscribe_with(probe.clone());
  scheduler.advance_by(WINDOW);
  assert_eq!(probe.received(), [99]);
  assert!(probe.is_completed());
  assert!(source.is_cancelled());
  assert_eq!(scheduler.planned_tasks(), 0);
}

#[test]
fn terminals_disarm_the_timer() {
  let scheduler = DeterministicScheduler::new();
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone()).timeout(WINDOW, scheduler.clone()).subscribe_with(probe.clone());
  source.emit(1);
  source.complete();
  scheduler.advance_by(WINDOW + WINDOW);
  assert!(probe.is_completed());
  assert!(probe.error().is_none());
  assert_eq!(scheduler.planned_tasks(), 0);
}

#[test]
fn disposed_schedulers_reject_the_subscription() {
  let scheduler = DeterministicScheduler::new();
  scheduler.dispose();
  let probe = TestSubscriber::<u32>::with_demand(1);
  Flux::from_publisher(TestPublisher::<u32>::new().clone())
    .timeout(WINDOW, scheduler)
    .subscribe_with(probe.clone());
  assert!(matches!(probe.error(), Some(StreamError::SchedulerRejected)));
}
