use alloc::sync::Arc;

use super::ScalarSubscription;
use crate::reactive::{testing::TestSubscriber, CoreSubscriber, FusionMode, Subscription};

fn scalar_of(value: u32) -> (Arc<TestSubscriber<u32>>, Arc<ScalarSubscription<u32>>) {
  let probe = TestSubscriber::new();
  let downstream: Arc<dyn CoreSubscriber<u32>> = probe.clone();
  let subscription = Arc::new(ScalarSubscription::new(downstream, value));
  probe.on_subscribe(subscription.clone());
  (probe, subscription)
}

#[test]
fn value_is_delivered_on_first_request() {
  let (probe, _) = scalar_of(5);
  assert_eq!(probe.received_count(), 0);
  probe.request(1);
  assert_eq!(probe.received(), [5]);
  assert!(probe.is_completed());
}

#[test]
fn later_requests_deliver_nothing() {
  let (probe, _) = scalar_of(5);
  probe.request(1);
  probe.request(10);
  assert_eq!(probe.received(), [5]);
}

#[test]
fn cancel_before_request_discards_the_value() {
  let (probe, _) = scalar_of(7);
  probe.cancel();
  probe.request(1);
  assert_eq!(probe.received_count(), 0);
  assert_eq!(probe.discarded(), [7]);
  assert!(!probe.is_completed());
}

#[test]
fn zero_demand_is_a_protocol_error() {
  let probe = TestSubscriber::new();
  let downstream: Arc<dyn CoreSubscriber<u32>> = probe.clone();
  let subscription = Arc::new(ScalarSubscription::new(downstream, 9));
  subscription.request(0);
  assert!(probe.error().is_some());
  assert_eq!(probe.discarded(), [9]);
}

#[test]
fn sync_fusion_polls_the_value_once() {
  let (probe, subscription) = scalar_of(3);
  assert_eq!(subscription.request_fusion(FusionMode::ANY), FusionMode::SYNC);
  assert!(!subscription.is_poll_empty());
  assert_eq!(subscription.poll().expect("poll"), Some(3));
  assert_eq!(subscription.poll().expect("poll"), None);
  assert!(subscription.is_poll_empty());
  assert_eq!(probe.received_count(), 0);
}

#[test]
fn fusion_request_without_sync_is_refused() {
  let (_, subscription) = scalar_of(3);
  assert_eq!(subscription.request_fusion(FusionMode::ASYNC), FusionMode::NONE);
  let barrier = FusionMode::ANY.union(FusionMode::THREAD_BARRIER);
  assert_eq!(subscription.request_fusion(barrier), FusionMode::NONE);
}
