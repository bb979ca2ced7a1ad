use crate::reactive::{testing::{TestPublisher, TestSubscriber}, Flux, StreamError};

#[test]
fn sampler_ticks_emit_the_latest_value() {
  let source = TestPublisher::<u32>::new();
  let sampler = TestPublisher::<()>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone())
    .sample(Flux::from_publisher(sampler.clone()))
    .subscribe_with(probe.clone());
  source.emit(1);
  source.emit(2);
  sampler.emit(());
  source.emit(3);
  sampler.emit(());
  assert_eq!(probe.received(), [2, 3]);
  // The replaced value never reached downstream.
  assert_eq!(probe.discarded(), [1]);
}

#[test]
fn tick_without_a_value_is_a_no_op() {
  let source = TestPublisher::<u32>::new();
  let sampler = TestPublisher::<()>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone())
    .sample(Flux::from_publisher(sampler.clone()))
    .subscribe_with(probe.clone());
  sampler.emit(());
  assert_eq!(probe.received_count(), 0);
  assert!(!probe.is_terminated());
}

#[test]
fn main_completion_cancels_the_sampler() {
  let source = TestPublisher::<u32>::new();
  let sampler = TestPublisher::<()>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone())
    .sample(Flux::from_publisher(sampler.clone()))
    .subscribe_with(probe.clone());
  source.emit(5);
  source.complete();
  assert!(probe.is_completed());
  assert!(sampler.is_cancelled());
  assert_eq!(probe.discarded(), [5]);
}

#[test]
fn tick_with_zero_demand_is_an_overflow() {
  let source = TestPublisher::<u32>::new();
  let sampler = TestPublisher::<()>::new();
  let probe = TestSubscriber::new();
  Flux::from_publisher(source.clone())
    .sample(Flux::from_publisher(sampler.clone()))
    .subscribe_with(probe.clone());
  source.emit(1);
  sampler.emit(());
  assert!(matches!(probe.error(), Some(StreamError::Overflow { .. })));
  assert!(source.is_cancelled());
}
