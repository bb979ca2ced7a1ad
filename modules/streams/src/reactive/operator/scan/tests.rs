use alloc::vec;

use crate::reactive::{testing::TestSubscriber, Flux};

#[test]
fn running_accumulation_is_emitted_per_value() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_vec(vec![1, 2, 3, 4]).scan(0, |acc, value| acc + value).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1, 3, 6, 10]);
  assert!(probe.is_completed());
}

#[test]
fn empty_sources_emit_nothing() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::<u32>::empty().scan(0, |acc, value| acc + value).subscribe_with(probe.clone());
  assert_eq!(probe.received_count(), 0);
  assert!(probe.is_completed());
}

#[test]
fn accumulation_restarts_per_subscription() {
  let flux = Flux::from_vec(vec![1, 1]).scan(0, |acc, value| acc + value);
  let first = TestSubscriber::with_demand(u64::MAX);
  let second = TestSubscriber::with_demand(u64::MAX);
  flux.clone().subscribe_with(first.clone());
  flux.subscribe_with(second.clone());
  assert_eq!(first.received(), [1, 2]);
  assert_eq!(second.received(), [1, 2]);
}
