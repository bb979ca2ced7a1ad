use portable_atomic::{AtomicU64, Ordering};

use super::{add_cap, add_cap_atomic, produced, sub_or_zero, validate_demand};

#[test]
fn add_cap_saturates_at_the_sentinel() {
  assert_eq!(add_cap(1, 2), 3);
  assert_eq!(add_cap(u64::MAX, 1), u64::MAX);
  assert_eq!(add_cap(u64::MAX - 1, 5), u64::MAX);
}

#[test]
fn sub_or_zero_floors_at_zero() {
  assert_eq!(sub_or_zero(5, 3), 2);
  assert_eq!(sub_or_zero(3, 5), 0);
}

#[test]
fn atomic_add_reports_the_previous_value() {
  let counter = AtomicU64::new(0);
  assert_eq!(add_cap_atomic(&counter, 10), 0);
  assert_eq!(add_cap_atomic(&counter, 5), 10);
  assert_eq!(counter.load(Ordering::Relaxed), 15);
}

#[test]
fn atomic_add_freezes_at_the_sentinel() {
  let counter = AtomicU64::new(u64::MAX - 1);
  assert_eq!(add_cap_atomic(&counter, 10), u64::MAX - 1);
  assert_eq!(counter.load(Ordering::Relaxed), u64::MAX);
  assert_eq!(add_cap_atomic(&counter, 1), u64::MAX);
}

#[test]
fn produced_skips_unbounded_counters() {
  let counter = AtomicU64::new(u64::MAX);
  produced(&counter, 100);
  assert_eq!(counter.load(Ordering::Relaxed), u64::MAX);
  let bounded = AtomicU64::new(10);
  produced(&bounded, 4);
  assert_eq!(bounded.load(Ordering::Relaxed), 6);
}

#[test]
fn zero_demand_is_rejected() {
  assert!(validate_demand(0).is_err());
  assert!(validate_demand(1).is_ok());
  assert!(validate_demand(u64::MAX).is_ok());
}
