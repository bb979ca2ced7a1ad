use alloc::vec;

use crate::reactive::{testing::{TestPublisher, TestSubscriber}, Flux};

#[test]
fn buffers_are_emitted_at_the_configured_size() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::range(1, 6).buffer_count(2).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [vec![1, 2], vec![3, 4], vec![5, 6]]);
  assert!(probe.is_completed());
}

#[test]
fn the_final_partial_buffer_is_flushed_on_completion() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::range(1, 5).buffer_count(2).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [vec![1, 2], vec![3, 4], vec![5]]);
  assert!(probe.is_completed());
}

#[test]
fn one_buffer_of_demand_converts_to_size_upstream_values() {
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(1);
  Flux::from_publisher(source.clone()).buffer_count(3).subscribe_with(probe.clone());
  assert_eq!(source.requested_demand(), 3);
}

#[test]
fn failure_discards_the_open_buffer() {
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone()).buffer_count(3).subscribe_with(probe.clone());
  source.emit(1);
  source.emit(2);
  source.fail(crate::reactive::StreamError::message("boom"));
  assert_eq!(probe.received_count(), 0);
  assert_eq!(probe.discarded(), [1, 2]);
  assert!(probe.error().is_some());
}

#[test]
fn cancellation_discards_the_open_buffer() {
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone()).buffer_count(3).subscribe_with(probe.clone());
  source.emit(7);
  probe.cancel();
  assert!(source.is_cancelled());
  assert_eq!(probe.discarded(), [7]);
}
