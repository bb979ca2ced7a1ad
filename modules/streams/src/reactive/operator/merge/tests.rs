use alloc::{vec, vec::Vec};

use crate::reactive::{testing::{TestPublisher, TestSubscriber}, Flux, StreamError};

#[test]
fn values_from_every_source_arrive() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::merge(vec![Flux::from_vec(vec![1, 2]), Flux::from_vec(vec![3, 4])]).subscribe_with(probe.clone());
  let mut received = probe.received();
  received.sort_unstable();
  assert_eq!(received, [1, 2, 3, 4]);
  assert!(probe.is_completed());
}

#[test]
fn interleaving_follows_arrival_order() {
  let left = TestPublisher::<u32>::new();
  let right = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::merge(vec![Flux::from_publisher(left.clone()), Flux::from_publisher(right.clone())])
    .subscribe_with(probe.clone());
  left.emit(1);
  right.emit(10);
  left.emit(2);
  left.complete();
  right.complete();
  assert_eq!(probe.received(), [1, 10, 2]);
  assert!(probe.is_completed());
}

#[test]
fn demand_gates_the_drain() {
  let left = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(1);
  Flux::merge(vec![Flux::from_publisher(left.clone())]).subscribe_with(probe.clone());
  left.emit(1);
  left.emit(2);
  assert_eq!(probe.received(), [1]);
  probe.request(1);
  assert_eq!(probe.received(), [1, 2]);
}

#[test]
fn fast_errors_cancel_the_other_sources() {
  let left = TestPublisher::<u32>::new();
  let right = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::merge(vec![Flux::from_publisher(left.clone()), Flux::from_publisher(right.clone())])
    .subscribe_with(probe.clone());
  left.fail(StreamError::message("left died"));
  assert!(probe.error().is_some());
  assert!(right.is_cancelled());
}

#[test]
fn delayed_errors_wait_for_every_source() {
  let right_values: Vec<u32> = vec![1, 2];
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::merge_delay_error(vec![
    Flux::error(StreamError::message("left died")),
    Flux::from_vec(right_values),
  ])
  .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1, 2]);
  assert!(probe.error().is_some());
}

#[test]
fn cancellation_discards_queued_values() {
  let left = TestPublisher::<u32>::new();
  let probe = TestSubscriber::new();
  Flux::merge(vec![Flux::from_publisher(left.clone())]).subscribe_with(probe.clone());
  left.emit(1);
  left.emit(2);
  probe.cancel();
  assert!(left.is_cancelled());
  assert_eq!(probe.discarded(), [1, 2]);
  assert_eq!(probe.received_count(), 0);
}
