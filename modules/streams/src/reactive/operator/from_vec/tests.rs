use alloc::vec;

use crate::reactive::{testing::TestSubscriber, Flux, StreamError};

#[test]
fn unbounded_demand_takes_the_fast_path() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_vec(vec![1, 2, 3]).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1, 2, 3]);
  assert!(probe.is_completed());
}

#[test]
fn bounded_demand_is_honoured_batch_by_batch() {
  let probe = TestSubscriber::with_demand(2);
  Flux::from_vec(vec![1, 2, 3, 4, 5]).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1, 2]);
  assert!(!probe.is_terminated());
  probe.request(2);
  assert_eq!(probe.received(), [1, 2, 3, 4]);
  probe.request(10);
  assert_eq!(probe.received(), [1, 2, 3, 4, 5]);
  assert!(probe.is_completed());
}

#[test]
fn empty_vector_completes_without_demand() {
  let probe = TestSubscriber::<u32>::new();
  Flux::from_vec(vec![]).subscribe_with(probe.clone());
  assert!(probe.is_completed());
  assert_eq!(probe.received_count(), 0);
}

#[test]
fn zero_demand_is_a_protocol_error() {
  let probe = TestSubscriber::<u32>::new();
  Flux::from_vec(vec![1]).subscribe_with(probe.clone());
  probe.request(0);
  assert!(matches!(probe.error(), Some(StreamError::InvalidDemand { requested: 0 })));
}

#[test]
fn cancel_stops_emission_mid_batch() {
  let probe = TestSubscriber::<u32>::new();
  Flux::from_vec(vec![1, 2, 3]).subscribe_with(probe.clone());
  probe.request(1);
  probe.cancel();
  probe.request(5);
  assert_eq!(probe.received(), [1]);
  assert!(!probe.is_terminated());
}
