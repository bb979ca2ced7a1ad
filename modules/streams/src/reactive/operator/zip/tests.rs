use alloc::vec;

use crate::reactive::{testing::{TestPublisher, TestSubscriber}, Flux};

#[test]
fn rows_pair_positionally() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_vec(vec![1, 2, 3])
    .zip_with(Flux::from_vec(vec![10, 20, 30]), |a, b| a + b)
    .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [11, 22, 33]);
  assert!(probe.is_completed());
}

#[test]
fn the_shorter_source_ends_the_sequence() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_vec(vec![1, 2, 3, 4])
    .zip_with(Flux::from_vec(vec![10, 20]), |a, b| a + b)
    .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [11, 22]);
  assert!(probe.is_completed());
}

#[test]
fn rows_wait_for_both_heads() {
  let left = TestPublisher::<u32>::new();
  let right = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(left.clone())
    .zip_with(Flux::from_publisher(right.clone()), |a, b| (a, b))
    .subscribe_with(probe.clone());
  left.emit(1);
  left.emit(2);
  assert_eq!(probe.received_count(), 0);
  right.emit(10);
  assert_eq!(probe.received(), [(1, 10)]);
  right.emit(20);
  assert_eq!(probe.received(), [(1, 10), (2, 20)]);
}

#[test]
fn one_side_completing_cancels_the_other() {
  let left = TestPublisher::<u32>::new();
  let right = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(left.clone())
    .zip_with(Flux::from_publisher(right.clone()), |a, b| a + b)
    .subscribe_with(probe.clone());
  left.complete();
  assert!(probe.is_completed());
  assert!(right.is_cancelled());
}

#[test]
fn unpaired_values_are_discarded_at_termination() {
  let left = TestPublisher::<u32>::new();
  let right = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(left.clone())
    .zip_with(Flux::from_publisher(right.clone()), |a, b| a + b)
    .subscribe_with(probe.clone());
  left.emit(1);
  left.emit(2);
  right.emit(10);
  right.complete();
  assert_eq!(probe.received(), [11]);
  assert!(probe.is_completed());
  assert_eq!(probe.discarded(), [2]);
}

#[test]
fn zip_all_emits_row_vectors() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::zip_all(vec![
    Flux::from_vec(vec![1, 2]),
    Flux::from_vec(vec![10, 20]),
    Flux::from_vec(vec![100, 200]),
  ])
  .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [vec![1, 10, 100], vec![2, 20, 200]]);
  assert!(probe.is_completed());
}
