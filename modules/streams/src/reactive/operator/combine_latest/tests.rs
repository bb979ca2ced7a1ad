use alloc::vec;

use crate::reactive::{testing::{TestPublisher, TestSubscriber}, Flux};

#[test]
fn combinations_start_once_both_sides_produced() {
  let left = TestPublisher::<u32>::new();
  let right = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(left.clone())
    .combine_latest(Flux::from_publisher(right.clone()), |a, b| (*a, *b))
    .subscribe_with(probe.clone());
  left.emit(1);
  assert_eq!(probe.received_count(), 0);
  right.emit(10);
  left.emit(2);
  right.emit(20);
  assert_eq!(probe.received(), [(1, 10), (2, 10), (2, 20)]);
}

#[test]
fn completion_needs_both_sides() {
  let left = TestPublisher::<u32>::new();
  let right = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(left.clone())
    .combine_latest(Flux::from_publisher(right.clone()), |a, b| a + b)
    .subscribe_with(probe.clone());
  left.emit(1);
  right.emit(10);
  left.complete();
  assert!(!probe.is_terminated());
  right.complete();
  assert!(probe.is_completed());
}

#[test]
fn a_side_completing_empty_ends_everything() {
  let left = TestPublisher::<u32>::new();
  let right = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(left.clone())
    .combine_latest(Flux::from_publisher(right.clone()), |a, b| a + b)
    .subscribe_with(probe.clone());
  left.complete();
  assert!(probe.is_completed());
  assert!(right.is_cancelled());
}

#[test]
fn failure_cancels_the_other_side() {
  let left = TestPublisher::<u32>::new();
  let right = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(left.clone())
    .combine_latest(Flux::from_publisher(right.clone()), |a, b| a + b)
    .subscribe_with(probe.clone());
  left.fail(crate::reactive::StreamError::message("left died"));
  assert!(probe.error().is_some());
  assert!(right.is_cancelled());
}

#[test]
fn combine_latest_all_spans_every_source() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::combine_latest_all(
    vec![Flux::just(1_u32), Flux::just(2_u32), Flux::just(3_u32)],
    |row| row.iter().sum::<u32>(),
  )
  .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [6]);
  assert!(probe.is_completed());
}
