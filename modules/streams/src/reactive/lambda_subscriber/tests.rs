use alloc::{sync::Arc, vec, vec::Vec};

use spin::Mutex;

use crate::reactive::{Disposable, Flux, StreamError};

#[test]
fn callbacks_receive_the_matching_signals() {
  let values = Arc::new(Mutex::new(Vec::new()));
  let completions = Arc::new(Mutex::new(0_u32));
  let value_sink = values.clone();
  let completion_sink = completions.clone();
  let handle = Flux::from_vec(vec![1, 2, 3]).subscribe_with_handlers(
    move |value| value_sink.lock().push(value),
    |_| {},
    move || *completion_sink.lock() += 1,
  );
  assert_eq!(*values.lock(), [1, 2, 3]);
  assert_eq!(*completions.lock(), 1);
  assert!(handle.is_disposed());
}

#[test]
fn errors_reach_the_error_callback() {
  let seen = Arc::new(Mutex::new(None));
  let sink = seen.clone();
  Flux::<u32>::error(StreamError::message("boom")).subscribe_with_handlers(
    |_| {},
    move |error| *sink.lock() = Some(error),
    || {},
  );
  assert!(seen.lock().is_some());
}

#[test]
fn disposing_cancels_the_upstream() {
  let source = crate::reactive::testing::TestPublisher::<u32>::new();
  let received = Arc::new(Mutex::new(Vec::new()));
  let sink = received.clone();
  let handle = Flux::from_publisher(source.clone()).subscribe(move |value| sink.lock().push(value));
  source.emit(1);
  handle.dispose();
  assert!(source.is_cancelled());
  assert_eq!(*received.lock(), [1]);
}
