use crate::reactive::{testing::TestSubscriber, Mono, StreamError};

#[test]
fn the_next_sequence_runs_after_completion() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Mono::just(1_u32).then(Mono::just(2_u32)).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [2]);
  assert!(probe.is_completed());
}

#[test]
fn first_stage_failures_short_circuit() {
  let probe = TestSubscriber::<u32>::with_demand(u64::MAX);
  Mono::<u32>::error(StreamError::message("boom")).then(Mono::just(2_u32)).subscribe_with(probe.clone());
  assert!(probe.error().is_some());
  assert_eq!(probe.received_count(), 0);
}

#[test]
fn first_stage_values_are_discarded_not_forwarded() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Mono::just(7_u32).then(Mono::just(8_u32)).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [8]);
  assert_eq!(probe.discarded(), [7]);
}
