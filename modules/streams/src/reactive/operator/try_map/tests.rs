use alloc::vec;

use crate::reactive::{testing::{TestPublisher, TestSubscriber}, Flux, StreamError};

#[test]
fn successful_mappings_flow_through() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_vec(vec![1, 2, 3]).try_map(|value| Ok(value * 2)).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [2, 4, 6]);
  assert!(probe.is_completed());
}

#[test]
fn mapper_failure_cancels_upstream_and_discards_the_input() {
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone())
    .try_map(|value| if *value == 2 { Err(StreamError::message("bad value")) } else { Ok(*value) })
    .subscribe_with(probe.clone());
  source.emit(1);
  source.emit(2);
  assert_eq!(probe.received(), [1]);
  assert!(source.is_cancelled());
  assert_eq!(probe.discarded(), [2]);
  assert!(probe.error().is_some());
}

#[test]
fn values_after_the_failure_are_dropped() {
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone())
    .try_map(|_| Err::<u32, _>(StreamError::message("always")))
    .subscribe_with(probe.clone());
  source.emit(1);
  source.emit(2);
  assert_eq!(probe.received_count(), 0);
  assert_eq!(probe.dropped_values(), [2]);
}
