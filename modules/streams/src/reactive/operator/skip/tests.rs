use crate::reactive::{testing::{TestPublisher, TestSubscriber}, Flux};

#[test]
fn leading_values_are_discarded() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::range(0, 5).skip(2).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [2, 3, 4]);
  assert_eq!(probe.discarded(), [0, 1]);
  assert!(probe.is_completed());
}

#[test]
fn first_request_pre_pays_for_the_skipped_values() {
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(3);
  Flux::from_publisher(source.clone()).skip(2).subscribe_with(probe.clone());
  assert_eq!(source.requested_demand(), 5);
  probe.request(1);
  assert_eq!(source.requested_demand(), 6);
}

#[test]
fn skipping_more_than_available_completes_empty() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::range(0, 3).skip(10).subscribe_with(probe.clone());
  assert_eq!(probe.received_count(), 0);
  assert!(probe.is_completed());
}
