use alloc::{sync::Arc, vec::Vec};

use spin::Mutex;

use super::{
  context_with_discard_hook, context_with_error_dropped_hook, on_discard, on_error_dropped, reset_on_next_dropped,
  set_on_next_dropped, on_next_dropped, ValueHook,
};
use crate::reactive::{Context, StreamError};

fn recording_hook(seen: Arc<Mutex<Vec<u32>>>) -> ValueHook {
  Arc::new(move |value| {
    if let Ok(value) = value.downcast::<u32>() {
      seen.lock().push(*value);
    }
  })
}

#[test]
fn context_hook_receives_discarded_values() {
  let seen = Arc::new(Mutex::new(Vec::new()));
  let context = context_with_discard_hook(&Context::empty(), recording_hook(seen.clone()));
  on_discard(7_u32, &context);
  on_discard(8_u32, &context);
  assert_eq!(*seen.lock(), [7, 8]);
}

#[test]
fn missing_hooks_silently_drop_the_value() {
  on_discard(1_u32, &Context::empty());
}

#[test]
fn context_hook_receives_dropped_errors() {
  let seen = Arc::new(Mutex::new(Vec::new()));
  let sink = seen.clone();
  let hook = Arc::new(move |error: &StreamError| sink.lock().push(error.clone()));
  let context = context_with_error_dropped_hook(&Context::empty(), hook);
  on_error_dropped(&StreamError::Cancelled, &context);
  assert_eq!(seen.lock().len(), 1);
}

#[test]
fn global_fallback_serves_hookless_contexts() {
  let seen = Arc::new(Mutex::new(Vec::new()));
  set_on_next_dropped(recording_hook(seen.clone()));
  on_next_dropped(987_654_u32, &Context::empty());
  reset_on_next_dropped();
  assert!(seen.lock().contains(&987_654));
}
