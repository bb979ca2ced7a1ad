use alloc::vec;

use crate::reactive::{testing::{TestPublisher, TestSubscriber}, Flux, StreamError};

#[test]
fn sources_run_back_to_back() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::concat(vec![Flux::from_vec(vec![1, 2, 3]), Flux::from_vec(vec![4, 5])]).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1, 2, 3, 4, 5]);
  assert!(probe.is_completed());
}

#[test]
fn demand_is_conserved_across_the_switch() {
  let probe = TestSubscriber::with_demand(3);
  Flux::concat(vec![Flux::from_vec(vec![1, 2, 3]), Flux::from_vec(vec![4, 5])]).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1, 2, 3]);
  assert!(!probe.is_terminated());
  probe.request(2);
  assert_eq!(probe.received(), [1, 2, 3, 4, 5]);
  assert!(probe.is_completed());
  assert_eq!(probe.received_count(), 5);
}

#[test]
fn error_stops_the_walk_by_default() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::concat(vec![Flux::error(StreamError::message("first failed")), Flux::from_vec(vec![1])])
    .subscribe_with(probe.clone());
  assert!(probe.error().is_some());
  assert_eq!(probe.received_count(), 0);
}

#[test]
fn delayed_errors_surface_after_the_remaining_sources() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::concat_delay_error(vec![
    Flux::error(StreamError::message("first failed")),
    Flux::from_vec(vec![1, 2]),
  ])
  .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1, 2]);
  assert!(probe.error().is_some());
}

#[test]
fn empty_source_list_completes() {
  let probe = TestSubscriber::<u32>::new();
  Flux::concat(vec![]).subscribe_with(probe.clone());
  assert!(probe.is_completed());
}

#[test]
fn cancellation_reaches_the_active_source() {
  let first = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::concat(vec![Flux::from_publisher(first.clone()), Flux::from_vec(vec![9])]).subscribe_with(probe.clone());
  first.emit(1);
  probe.cancel();
  assert!(first.is_cancelled());
  assert_eq!(probe.received(), [1]);
  assert!(!probe.is_terminated());
}
