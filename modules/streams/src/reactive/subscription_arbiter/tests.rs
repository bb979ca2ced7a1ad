use alloc::sync::Arc;

use portable_atomic::{AtomicBool, AtomicU64, Ordering};

use super::SubscriptionArbiter;
use crate::reactive::{support::add_cap_atomic, Subscription};

struct CountingSubscription {
  requested: AtomicU64,
  cancelled: AtomicBool,
}

impl CountingSubscription {
  fn new() -> Arc<Self> {
    Arc::new(Self { requested: AtomicU64::new(0), cancelled: AtomicBool::new(false) })
  }
}

impl Subscription<u32> for CountingSubscription {
  fn request(&self, n: u64) {
    add_cap_atomic(&self.requested, n);
  }

  fn cancel(&self) {
    self.cancelled.store(true, Ordering::Release);
  }
}

#[test]
fn switch_reissues_outstanding_demand() {
  let arbiter = SubscriptionArbiter::<u32>::new();
  arbiter.request(10);
  let first = CountingSubscription::new();
  assert!(arbiter.set(first.clone()));
  assert_eq!(first.requested.load(Ordering::Acquire), 10);

  arbiter.produced(4);
  assert_eq!(arbiter.outstanding(), 6);

  let second = CountingSubscription::new();
  assert!(arbiter.set(second.clone()));
  assert_eq!(second.requested.load(Ordering::Acquire), 6);
}

#[test]
fn unbounded_demand_never_shrinks() {
  let arbiter = SubscriptionArbiter::<u32>::new();
  arbiter.request(u64::MAX);
  arbiter.produced(1_000);
  assert_eq!(arbiter.outstanding(), u64::MAX);
  let next = CountingSubscription::new();
  assert!(arbiter.set(next.clone()));
  assert_eq!(next.requested.load(Ordering::Acquire), u64::MAX);
}

#[test]
fn switch_cancels_the_previous_upstream() {
  let arbiter = SubscriptionArbiter::<u32>::new();
  let first = CountingSubscription::new();
  let second = CountingSubscription::new();
  assert!(arbiter.set(first.clone()));
  assert!(arbiter.set(second.clone()));
  assert!(first.cancelled.load(Ordering::Acquire));
  assert!(!second.cancelled.load(Ordering::Acquire));
}

#[test]
fn cancel_reaches_the_current_upstream_once() {
  let arbiter = SubscriptionArbiter::<u32>::new();
  let upstream = CountingSubscription::new();
  assert!(arbiter.set(upstream.clone()));
  arbiter.cancel();
  arbiter.cancel();
  assert!(upstream.cancelled.load(Ordering::Acquire));
  assert!(arbiter.is_cancelled());
  let late = CountingSubscription::new();
  assert!(!arbiter.set(late.clone()));
  assert!(late.cancelled.load(Ordering::Acquire));
}

#[test]
fn requests_forward_to_the_current_upstream() {
  let arbiter = SubscriptionArbiter::<u32>::new();
  let upstream = CountingSubscription::new();
  assert!(arbiter.set(upstream.clone()));
  arbiter.request(3);
  arbiter.request(2);
  assert_eq!(upstream.requested.load(Ordering::Acquire), 5);
}
