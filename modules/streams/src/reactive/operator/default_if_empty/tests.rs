use alloc::vec;

use crate::reactive::{testing::TestSubscriber, Flux};

#[test]
fn non_empty_sources_pass_through() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_vec(vec![1, 2]).default_if_empty(9).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1, 2]);
  assert!(probe.is_completed());
}

#[test]
fn empty_sources_emit_the_fallback() {
  let probe = TestSubscriber::with_demand(1);
  Flux::empty().default_if_empty(9_u32).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [9]);
  assert!(probe.is_completed());
}

#[test]
fn fallback_waits_for_demand() {
  let probe = TestSubscriber::<u32>::new();
  Flux::empty().default_if_empty(9_u32).subscribe_with(probe.clone());
  assert_eq!(probe.received_count(), 0);
  assert!(!probe.is_terminated());
  probe.request(1);
  assert_eq!(probe.received(), [9]);
  assert!(probe.is_completed());
}

#[test]
fn cancelling_a_parked_fallback_discards_it() {
  let probe = TestSubscriber::<u32>::new();
  Flux::empty().default_if_empty(9_u32).subscribe_with(probe.clone());
  probe.cancel();
  assert_eq!(probe.discarded(), [9]);
  assert_eq!(probe.received_count(), 0);
}
