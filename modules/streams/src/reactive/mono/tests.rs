use crate::reactive::{testing::TestSubscriber, Mono, StreamError};

#[test]
fn just_emits_once_and_completes() {
  let probe = TestSubscriber::with_demand(1);
  Mono::just(5_u32).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [5]);
  assert!(probe.is_completed());
}

#[test]
fn empty_and_error_are_terminal_only() {
  let empty_probe = TestSubscriber::<u32>::with_demand(1);
  Mono::empty().subscribe_with(empty_probe.clone());
  assert!(empty_probe.is_completed());

  let error_probe = TestSubscriber::<u32>::with_demand(1);
  Mono::error(StreamError::message("boom")).subscribe_with(error_probe.clone());
  assert!(error_probe.error().is_some());
}

#[test]
fn map_transforms_the_single_value() {
  let probe = TestSubscriber::with_demand(1);
  Mono::just(4_u32).map(|value| value * value).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [16]);
}

#[test]
fn from_fn_defers_the_computation_until_demand() {
  let probe = TestSubscriber::new();
  Mono::from_fn(|| Ok(Some(9_u32))).subscribe_with(probe.clone());
  assert_eq!(probe.received_count(), 0);
  probe.request(1);
  assert_eq!(probe.received(), [9]);
}

#[test]
fn defer_builds_per_subscription() {
  let mono = Mono::defer(|| Mono::just(1_u32));
  let first = TestSubscriber::with_demand(1);
  let second = TestSubscriber::with_demand(1);
  mono.subscribe_with(first.clone());
  mono.subscribe_with(second.clone());
  assert_eq!(first.received(), [1]);
  assert_eq!(second.received(), [1]);
}

#[test]
fn retry_reruns_the_mono() {
  use alloc::sync::Arc;
  use portable_atomic::{AtomicUsize, Ordering};
  let attempts = Arc::new(AtomicUsize::new(0));
  let counter = attempts.clone();
  let probe = TestSubscriber::with_demand(1);
  Mono::defer(move || {
    if counter.fetch_add(1, Ordering::AcqRel) == 0 {
      Mono::error(StreamError::message("transient"))
    } else {
      Mono::just(3_u32)
    }
  })
  .retry(1)
  .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [3]);
  assert_eq!(attempts.load(Ordering::Acquire), 2);
}

#[test]
fn flux_widening_preserves_the_sequence() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Mono::just(7_u32).flux().map(|value| value + 1).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [8]);
  assert!(probe.is_completed());
}
