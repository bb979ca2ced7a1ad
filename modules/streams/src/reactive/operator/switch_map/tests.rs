use alloc::vec;

use crate::reactive::{testing::{TestPublisher, TestSubscriber}, Flux, StreamError};

#[test]
fn each_value_switches_to_its_derived_sequence() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_vec(vec![1_u32, 2])
    .switch_map(|value| Flux::from_vec(vec![value * 10, value * 10 + 1]))
    .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [10, 11, 20, 21]);
  assert!(probe.is_completed());
}

#[test]
fn a_new_value_cancels_the_previous_inner() {
  let main = TestPublisher::<u32>::new();
  let first_inner = TestPublisher::<u32>::new();
  let second_inner = TestPublisher::<u32>::new();
  let first = Flux::from_publisher(first_inner.clone());
  let second = Flux::from_publisher(second_inner.clone());
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(main.clone())
    .switch_map(move |value| if value == 1 { first.clone() } else { second.clone() })
    .subscribe_with(probe.clone());
  main.emit(1);
  first_inner.emit(100);
  main.emit(2);
  assert!(first_inner.is_cancelled());
  first_inner.emit(101);
  second_inner.emit(200);
  main.complete();
  second_inner.complete();
  assert_eq!(probe.received(), [100, 200]);
  assert_eq!(probe.dropped_values(), [101]);
  assert!(probe.is_completed());
}

#[test]
fn completion_waits_for_the_last_inner() {
  let main = TestPublisher::<u32>::new();
  let inner = TestPublisher::<u32>::new();
  let inner_flux = Flux::from_publisher(inner.clone());
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(main.clone())
    .switch_map(move |_| inner_flux.clone())
    .subscribe_with(probe.clone());
  main.emit(1);
  main.complete();
  assert!(!probe.is_terminated());
  inner.emit(7);
  inner.complete();
  assert_eq!(probe.received(), [7]);
  assert!(probe.is_completed());
}

#[test]
fn inner_failures_cancel_the_main_source() {
  let main = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(main.clone())
    .switch_map(|_| Flux::<u32>::error(StreamError::message("inner died")))
    .subscribe_with(probe.clone());
  main.emit(1);
  assert!(probe.error().is_some());
  assert!(main.is_cancelled());
}
