use alloc::sync::Arc;

use portable_atomic::{AtomicUsize, Ordering};

use crate::reactive::{testing::TestSubscriber, Flux, StreamError};

fn flaky(fail_times: usize) -> (Arc<AtomicUsize>, Flux<u32>) {
  let attempts = Arc::new(AtomicUsize::new(0));
  let counter = attempts.clone();
  let flux = Flux::defer(move || {
    let attempt = counter.fetch_add(1, Ordering::AcqRel);
    if attempt < fail_times {
      Flux::error(StreamError::message("transient"))
    } else {
      Flux::from_vec(alloc::vec![1, 2])
    }
  });
  (attempts, flux)
}

#[test]
fn transient_failures_are_retried() {
  let (attempts, flux) = flaky(2);
  let probe = TestSubscriber::with_demand(u64::MAX);
  flux.retry(3).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1, 2]);
  assert!(probe.is_completed());
  assert_eq!(attempts.load(Ordering::Acquire), 3);
}

#[test]
fn exhausted_attempts_surface_the_error() {
  let (attempts, flux) = flaky(10);
  let probe = TestSubscriber::with_demand(u64::MAX);
  flux.retry(2).subscribe_with(probe.clone());
  assert!(probe.error().is_some());
  assert_eq!(attempts.load(Ordering::Acquire), 3);
}

#[test]
fn non_matching_errors_pass_through() {
  let (attempts, flux) = flaky(5);
  let probe = TestSubscriber::with_demand(u64::MAX);
  flux.retry_when(5, |_| false).subscribe_with(probe.clone());
  assert!(probe.error().is_some());
  assert_eq!(attempts.load(Ordering::Acquire), 1);
}

#[test]
fn demand_spans_attempts() {
  let (_, flux) = flaky(1);
  let probe = TestSubscriber::with_demand(2);
  flux.retry(1).subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1, 2]);
}
