use alloc::vec;

use crate::reactive::{testing::TestSubscriber, Flux, StreamError};

#[test]
fn failures_switch_to_the_recovery_sequence() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::concat(vec![Flux::from_vec(vec![1, 2]), Flux::error(StreamError::message("boom"))])
    .on_error_resume(|_| Flux::from_vec(vec![8, 9]))
    .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1, 2, 8, 9]);
  assert!(probe.is_completed());
}

#[test]
fn the_recovery_choice_sees_the_error() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::<u32>::error(StreamError::Cancelled)
    .on_error_resume(|error| {
      if matches!(error, StreamError::Cancelled) {
        Flux::just(1)
      } else {
        Flux::just(2)
      }
    })
    .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1]);
}

#[test]
fn recovery_failures_pass_through() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::<u32>::error(StreamError::message("first"))
    .on_error_resume(|_| Flux::error(StreamError::message("second")))
    .subscribe_with(probe.clone());
  assert_eq!(probe.error().map(|error| alloc::string::ToString::to_string(&error)), Some(alloc::string::String::from("second")));
}

#[test]
fn on_error_return_substitutes_one_value() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::<u32>::error(StreamError::message("boom")).on_error_return(42).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [42]);
  assert!(probe.is_completed());
}

#[test]
fn completions_pass_through_untouched() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_vec(vec![5]).on_error_resume(|_| Flux::just(0)).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [5]);
  assert!(probe.is_completed());
}
