use alloc::vec;

use crate::reactive::{testing::{TestPublisher, TestSubscriber}, Flux};

#[test]
fn refused_values_are_discarded() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_vec(vec![1, 2, 3, 4]).filter(|value| value % 2 == 0).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [2, 4]);
  assert_eq!(probe.discarded(), [1, 3]);
  assert!(probe.is_completed());
}

#[test]
fn conditional_path_preserves_bounded_demand() {
  // The vector source drives the conditional path: refused values must
  // not count against the requested amount.
  let probe = TestSubscriber::with_demand(2);
  Flux::from_vec(vec![1, 2, 3, 4, 5, 6]).filter(|value| value % 2 == 0).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [2, 4]);
  assert!(!probe.is_terminated());
  probe.request(1);
  assert_eq!(probe.received(), [2, 4, 6]);
  assert!(probe.is_completed());
}

#[test]
fn plain_producers_get_replacement_demand() {
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(1);
  Flux::from_publisher(source.clone()).filter(|value| *value > 10).subscribe_with(probe.clone());
  assert_eq!(source.requested_demand(), 1);
  source.emit(3);
  // One replacement unit was requested for the refused value.
  assert_eq!(source.requested_demand(), 2);
  source.emit(30);
  assert_eq!(probe.received(), [30]);
}
