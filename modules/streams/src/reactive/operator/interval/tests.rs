use core::time::Duration;

use crate::reactive::{testing::{DeterministicScheduler, TestSubscriber}, Flux, Scheduler, StreamError};

#[test]
fn ticks_follow_the_scheduler_clock() {
  let scheduler = DeterministicScheduler::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::interval(Duration::from_millis(10), scheduler.clone()).subscribe_with(probe.clone());
  assert_eq!(probe.received_count(), 0);
  scheduler.advance_by(Duration::from_millis(10));
  assert_eq!(probe.received(), [0]);
  scheduler.advance_by(Duration::from_millis(30));
  assert_eq!(probe.received(), [0, 1, 2, 3]);
}

#[test]
fn initial_delay_is_respected() {
  let scheduler = DeterministicScheduler::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::interval_with_delay(Duration::from_millis(50), Duration::from_millis(10), scheduler.clone())
    .subscribe_with(probe.clone());
  scheduler.advance_by(Duration::from_millis(40));
  assert_eq!(probe.received_count(), 0);
  scheduler.advance_by(Duration::from_millis(10));
  assert_eq!(probe.received(), [0]);
}

#[test]
fn tick_without_demand_is_an_overflow() {
  let scheduler = DeterministicScheduler::new();
  let probe = TestSubscriber::new();
  Flux::interval(Duration::from_millis(5), scheduler.clone()).subscribe_with(probe.clone());
  scheduler.advance_by(Duration::from_millis(5));
  assert!(matches!(probe.error(), Some(StreamError::Overflow { .. })));
  assert_eq!(scheduler.planned_tasks(), 0);
}

#[test]
fn cancellation_releases_the_timer() {
  let scheduler = DeterministicScheduler::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::interval(Duration::from_millis(5), scheduler.clone()).subscribe_with(probe.clone());
  scheduler.advance_by(Duration::from_millis(5));
  probe.cancel();
  scheduler.advance_by(Duration::from_millis(50));
  assert_eq!(probe.received(), [0]);
  assert_eq!(scheduler.planned_tasks(), 0);
}

#[test]
fn disposed_scheduler_rejects_the_subscription() {
  let scheduler = DeterministicScheduler::new();
  scheduler.dispose();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::interval(Duration::from_millis(5), scheduler).subscribe_with(probe.clone());
  assert!(matches!(probe.error(), Some(StreamError::SchedulerRejected)));
}
