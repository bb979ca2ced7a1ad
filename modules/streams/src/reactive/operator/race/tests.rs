use alloc::vec;

use crate::reactive::{testing::{TestPublisher, TestSubscriber}, Flux, StreamError};

fn pair() -> (
  alloc::sync::Arc<TestPublisher<u32>>,
  alloc::sync::Arc<TestPublisher<u32>>,
  alloc::sync::Arc<TestSubscriber<u32>>,
) {
  let left = TestPublisher::<u32>::new();
  let right = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::race(vec![Flux::from_publisher(left.clone()), Flux::from_publisher(right.clone())])
    .subscribe_with(probe.clone());
  (left, right, probe)
}

#[test]
fn the_first_value_decides_the_race() {
  let (left, right, probe) = pair();
  right.emit(10);
  left.emit(1);
  right.emit(20);
  right.complete();
  assert_eq!(probe.received(), [10, 20]);
  assert!(probe.is_completed());
  assert!(left.is_cancelled());
  assert_eq!(probe.dropped_values(), [1]);
}

#[test]
fn a_terminal_can_win_the_race() {
  let (left, right, probe) = pair();
  left.fail(StreamError::message("fast failure"));
  assert!(probe.error().is_some());
  assert!(right.is_cancelled());
}

#[test]
fn demand_reaches_every_contender_before_the_win() {
  let left = TestPublisher::<u32>::new();
  let right = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(5);
  Flux::race(vec![Flux::from_publisher(left.clone()), Flux::from_publisher(right.clone())])
    .subscribe_with(probe.clone());
  assert_eq!(left.requested_demand(), 5);
  assert_eq!(right.requested_demand(), 5);
}

#[test]
fn single_source_races_are_a_pass_through() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::race(vec![Flux::from_vec(vec![1, 2])]).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1, 2]);
  assert!(probe.is_completed());
}
