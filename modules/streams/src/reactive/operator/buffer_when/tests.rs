use alloc::vec;

use crate::reactive::{testing::{TestPublisher, TestSubscriber}, Flux, StreamError};

fn setup() -> (
  alloc::sync::Arc<TestPublisher<u32>>,
  alloc::sync::Arc<TestPublisher<()>>,
  alloc::sync::Arc<TestSubscriber<alloc::vec::Vec<u32>>>,
) {
  let source = TestPublisher::<u32>::new();
  let boundary = TestPublisher::<()>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone())
    .buffer_when(Flux::from_publisher(boundary.clone()))
    .subscribe_with(probe.clone());
  (source, boundary, probe)
}

#[test]
fn boundary_pulses_close_buffers() {
  let (source, boundary, probe) = setup();
  source.emit(1);
  source.emit(2);
  boundary.emit(());
  source.emit(3);
  source.emit(4);
  boundary.emit(());
  source.emit(5);
  source.complete();
  assert_eq!(probe.received(), [vec![1, 2], vec![3, 4], vec![5]]);
  assert!(probe.is_completed());
  assert!(boundary.is_cancelled());
}

#[test]
fn empty_segments_emit_nothing() {
  let (source, boundary, probe) = setup();
  boundary.emit(());
  boundary.emit(());
  source.emit(1);
  boundary.emit(());
  source.complete();
  assert_eq!(probe.received(), [vec![1]]);
  assert!(probe.is_completed());
}

#[test]
fn boundary_failure_discards_the_open_buffer() {
  let (source, boundary, probe) = setup();
  source.emit(1);
  boundary.fail(StreamError::message("boundary died"));
  assert_eq!(probe.received_count(), 0);
  assert_eq!(probe.discarded(), [1]);
  assert!(probe.error().is_some());
  assert!(source.is_cancelled());
}

#[test]
fn boundary_pulse_with_zero_demand_is_an_overflow() {
  let source = TestPublisher::<u32>::new();
  let boundary = TestPublisher::<()>::new();
  let probe = TestSubscriber::new();
  Flux::from_publisher(source.clone())
    .buffer_when(Flux::from_publisher(boundary.clone()))
    .subscribe_with(probe.clone());
  source.emit(1);
  boundary.emit(());
  assert!(matches!(probe.error(), Some(StreamError::Overflow { .. })));
  assert_eq!(probe.discarded(), [1]);
}

#[test]
fn completion_with_a_pending_buffer_and_no_demand_is_an_overflow() {
  let source = TestPublisher::<u32>::new();
  let boundary = TestPublisher::<()>::new();
  let probe = TestSubscriber::new();
  Flux::from_publisher(source.clone())
    .buffer_when(Flux::from_publisher(boundary.clone()))
    .subscribe_with(probe.clone());
  source.emit(1);
  source.complete();
  // The trailing buffer cannot be delivered; the terminal must still
  // arrive, as an overflow error rather than a silent hang.
  assert!(matches!(probe.error(), Some(StreamError::Overflow { .. })));
  assert!(!probe.is_completed());
  assert_eq!(probe.discarded(), [1]);
  assert!(boundary.is_cancelled());
}

#[test]
fn cancel_discards_and_cancels_both_sides() {
  let (source, boundary, probe) = setup();
  source.emit(9);
  probe.cancel();
  assert!(source.is_cancelled());
  assert!(boundary.is_cancelled());
  assert_eq!(probe.discarded(), [9]);
}

#[test]
fn values_after_close_are_dropped() {
  let (source, _, probe) = setup();
  source.complete();
  source.emit(5);
  assert!(probe.is_completed());
  assert_eq!(probe.dropped_values(), [5]);
}
