//! End-to-end pipeline behavior across assembled operator chains.

use alloc::{string::String, vec};
use core::time::Duration;

use crate::reactive::{
  testing::{DeterministicScheduler, TestPublisher, TestSubscriber},
  Flux, StreamError,
};

#[test]
fn mapped_and_filtered_range_under_unbounded_demand() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::range(1, 5).map(|value| value * 2).filter(|value| *value > 4).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [6, 8, 10]);
  assert!(probe.is_completed());
}

#[test]
fn concatenation_respects_staggered_demand() {
  let probe = TestSubscriber::with_demand(3);
  Flux::from_vec(vec![1, 2, 3])
    .concat_with(Flux::from_vec(vec![4, 5]))
    .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1, 2, 3]);
  assert!(!probe.is_terminated());
  probe.request(2);
  assert_eq!(probe.received(), [1, 2, 3, 4, 5]);
  assert!(probe.is_completed());
  assert_eq!(probe.received_count(), 5);
}

#[test]
fn switch_on_first_prefixes_the_lowered_first_value() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_vec(vec![String::from("A"), String::from("B"), String::from("C")])
    .switch_on_first(
      |signal, remainder| {
        let lead = signal.value().map(|value| value.to_lowercase()).unwrap_or_default();
        Flux::concat(vec![Flux::just(lead), remainder])
      },
      true,
    )
    .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [String::from("a"), String::from("B"), String::from("C")]);
  assert!(probe.is_completed());
}

#[test]
fn buffers_split_on_boundary_pulses() {
  let source = TestPublisher::<u32>::new();
  let boundary = TestPublisher::<()>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone())
    .buffer_when(Flux::from_publisher(boundary.clone()))
    .subscribe_with(probe.clone());
  source.emit(1);
  source.emit(2);
  boundary.emit(());
  source.emit(3);
  source.emit(4);
  boundary.emit(());
  source.emit(5);
  source.complete();
  assert_eq!(probe.received(), [vec![1, 2], vec![3, 4], vec![5]]);
  assert!(probe.is_completed());
}

#[test]
fn published_range_zips_with_its_own_tail() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::range(1, 5)
    .publish_with(|shared| shared.clone().zip_with(shared.skip(1), |a, b| a + b))
    .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [3, 5, 7, 9]);
  assert!(probe.is_completed());
}

#[test]
fn slow_sources_fall_back_after_the_timeout_window() {
  let scheduler = DeterministicScheduler::new();
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone())
    .timeout_or(Duration::from_millis(10), scheduler.clone(), Flux::from_vec(vec![99]))
    .subscribe_with(probe.clone());
  // The source would emit at 50ms; the window closes first.
  scheduler.advance_by(Duration::from_millis(10));
  source.emit(1);
  assert_eq!(probe.received(), [99]);
  assert!(probe.is_completed());
  assert!(source.is_cancelled());
  assert_eq!(scheduler.planned_tasks(), 0);
}

#[test]
fn cancel_is_idempotent_across_a_chain() {
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone()).map(|value| value + 1).take(10).subscribe_with(probe.clone());
  source.emit(1);
  for _ in 0..4 {
    probe.cancel();
  }
  assert!(source.is_cancelled());
  assert_eq!(probe.received(), [2]);
  assert!(!probe.is_terminated());
}

#[test]
fn double_on_subscribe_cancels_the_second_subscription() {
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone()).hide().subscribe_with(probe.clone());
  source.double_on_subscribe();
  source.emit(1);
  assert_eq!(probe.received(), [1]);
  assert_eq!(probe.subscribe_calls(), 1);
}

#[test]
fn errors_after_cancellation_reach_the_dropped_hook() {
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone()).map(|value| value).subscribe_with(probe.clone());
  source.complete();
  source.fail(StreamError::message("late"));
  assert!(probe.is_completed());
  assert!(probe.error().is_none());
  assert_eq!(probe.dropped_errors().len(), 1);
}

#[test]
fn iterables_and_predicates_compose() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_iter(1..=10_u32)
    .skip_while(|value| *value < 3)
    .take_while(|value| *value < 7)
    .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [3, 4, 5, 6]);
  assert!(probe.is_completed());
  // The boundary-crossing value was discarded, not delivered.
  assert_eq!(probe.discarded(), [1, 2, 7]);
}

#[test]
fn discarded_values_are_reported_exactly_once() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::range(1, 6).filter(|value| value % 2 == 0).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [2, 4]);
  assert_eq!(probe.discarded(), [1, 3, 5]);
}
