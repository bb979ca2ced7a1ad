use alloc::{sync::Arc, vec, vec::Vec};

use spin::Mutex;

use crate::reactive::{testing::TestSubscriber, Flux, StreamError};

#[test]
fn callbacks_fire_around_matching_signals() {
  let log = Arc::new(Mutex::new(Vec::new()));
  let first = log.clone();
  let subscribed = log.clone();
  let next = log.clone();
  let complete = log.clone();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_vec(vec![7_u32])
    .do_first(move || first.lock().push("first"))
    .do_on_subscribe(move || subscribed.lock().push("subscribe"))
    .do_on_next(move |_| next.lock().push("next"))
    .do_on_complete(move || complete.lock().push("complete"))
    .subscribe_with(probe.clone());
  assert_eq!(*log.lock(), ["first", "subscribe", "next", "complete"]);
  assert!(probe.is_completed());
}

#[test]
fn error_callback_sees_the_failure() {
  let seen = Arc::new(Mutex::new(None));
  let sink = seen.clone();
  let probe = TestSubscriber::<u32>::with_demand(1);
  Flux::error(StreamError::message("boom"))
    .do_on_error(move |error: &StreamError| *sink.lock() = Some(error.clone()))
    .subscribe_with(probe.clone());
  assert!(seen.lock().is_some());
  assert!(probe.error().is_some());
}

#[test]
fn request_and_cancel_are_observable() {
  let requests = Arc::new(Mutex::new(Vec::new()));
  let cancels = Arc::new(Mutex::new(0_u32));
  let request_log = requests.clone();
  let cancel_log = cancels.clone();
  let probe = TestSubscriber::<u64>::new();
  Flux::range(0, 100)
    .do_on_request(move |n| request_log.lock().push(n))
    .do_on_cancel(move || *cancel_log.lock() += 1)
    .subscribe_with(probe.clone());
  probe.request(5);
  probe.cancel();
  probe.cancel();
  assert_eq!(*requests.lock(), [5]);
  assert_eq!(*cancels.lock(), 1);
}
