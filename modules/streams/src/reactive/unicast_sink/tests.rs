use crate::reactive::{testing::TestSubscriber, Flux, FusionMode, StreamError, UnicastSink};

#[test]
fn pushed_values_drain_under_demand() {
  let sink = UnicastSink::new();
  sink.push(1_u32).expect("push");
  sink.push(2).expect("push");
  let probe = TestSubscriber::new();
  Flux::from_publisher(sink.clone()).subscribe_with(probe.clone());
  assert_eq!(probe.received_count(), 0);
  probe.request(1);
  assert_eq!(probe.received(), [1]);
  probe.request(10);
  assert_eq!(probe.received(), [1, 2]);
  sink.push(3).expect("push");
  assert_eq!(probe.received(), [1, 2, 3]);
}

#[test]
fn completion_is_delivered_after_the_queue_drains() {
  let sink = UnicastSink::new();
  sink.push(1_u32).expect("push");
  sink.complete();
  let probe = TestSubscriber::new();
  Flux::from_publisher(sink.clone()).subscribe_with(probe.clone());
  assert!(!probe.is_terminated());
  probe.request(1);
  assert_eq!(probe.received(), [1]);
  assert!(probe.is_completed());
}

#[test]
fn a_second_subscriber_is_refused() {
  let sink = UnicastSink::<u32>::new();
  let first = TestSubscriber::with_demand(1);
  let second = TestSubscriber::with_demand(1);
  Flux::from_publisher(sink.clone()).subscribe_with(first.clone());
  Flux::from_publisher(sink.clone()).subscribe_with(second.clone());
  assert!(matches!(second.error(), Some(StreamError::InnerAlreadySubscribed)));
  assert!(second.error().is_some());
  assert!(first.error().is_none());
}

#[test]
fn pushes_after_terminal_hand_the_value_back() {
  let sink = UnicastSink::<u32>::new();
  sink.complete();
  assert_eq!(sink.push(5), Err(5));
}

#[test]
fn cancel_discards_queued_values() {
  let sink = UnicastSink::new();
  sink.push(1_u32).expect("push");
  sink.push(2).expect("push");
  let probe = TestSubscriber::new();
  Flux::from_publisher(sink.clone()).subscribe_with(probe.clone());
  probe.cancel();
  assert!(sink.is_cancelled());
  assert_eq!(probe.discarded(), [1, 2]);
  assert_eq!(sink.push(3), Err(3));
}

#[test]
fn async_fusion_wakes_instead_of_emitting() {
  let sink = UnicastSink::<u32>::new();
  let probe = TestSubscriber::new();
  Flux::from_publisher(sink.clone()).subscribe_with(probe.clone());
  let subscription = probe.upstream().expect("subscription");
  assert_eq!(subscription.request_fusion(FusionMode::ANY), FusionMode::ASYNC);
  sink.push(4).expect("push");
  // Values stay in the queue until polled.
  assert_eq!(probe.received_count(), 0);
  assert_eq!(subscription.poll().expect("poll"), Some(4));
  assert_eq!(subscription.poll().expect("poll"), None);
}
