use alloc::vec;

use crate::reactive::{testing::TestSubscriber, Flux};

#[test]
fn repeats_are_dropped_and_discarded() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_vec(vec![1, 2, 1, 3, 2, 4]).distinct().subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1, 2, 3, 4]);
  assert_eq!(probe.discarded(), [1, 2]);
  assert!(probe.is_completed());
}

#[test]
fn bounded_demand_is_not_consumed_by_repeats() {
  let probe = TestSubscriber::with_demand(3);
  Flux::from_vec(vec![1, 1, 1, 2, 2, 3]).distinct().subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1, 2, 3]);
  assert!(probe.is_completed());
}
