use alloc::{sync::Arc, vec, vec::Vec};

use spin::Mutex;

use super::FinallyKind;
use crate::reactive::{testing::TestSubscriber, Flux, StreamError};

fn recording() -> (Arc<Mutex<Vec<FinallyKind>>>, impl Fn(FinallyKind) + Send + Sync + 'static) {
  let log = Arc::new(Mutex::new(Vec::new()));
  let sink = log.clone();
  (log, move |kind| sink.lock().push(kind))
}

#[test]
fn completion_runs_the_callback_once() {
  let (log, callback) = recording();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_vec(vec![1_u32]).do_finally(callback).subscribe_with(probe.clone());
  assert_eq!(*log.lock(), [FinallyKind::Complete]);
}

#[test]
fn failure_runs_the_callback_after_the_terminal() {
  let (log, callback) = recording();
  let probe = TestSubscriber::<u32>::with_demand(1);
  Flux::error(StreamError::message("boom")).do_finally(callback).subscribe_with(probe.clone());
  assert!(probe.error().is_some());
  assert_eq!(*log.lock(), [FinallyKind::Error]);
}

#[test]
fn cancellation_counts_as_a_terminal() {
  let (log, callback) = recording();
  let probe = TestSubscriber::<u64>::new();
  Flux::range(0, 10).do_finally(callback).subscribe_with(probe.clone());
  probe.cancel();
  probe.cancel();
  assert_eq!(*log.lock(), [FinallyKind::Cancel]);
}
