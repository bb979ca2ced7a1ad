use alloc::{boxed::Box, sync::Arc};
use core::any::Any;

use spin::RwLock;

use super::{
  context::{Context, DISCARD_HOOK_KEY, ERROR_DROPPED_HOOK_KEY, NEXT_DROPPED_HOOK_KEY},
  stream_error::StreamError,
  subscription::Subscription,
};

#[cfg(test)]
mod tests;

/// Type-erased value handed to a value hook.
pub type DroppedValue = Box<dyn Any + Send>;
/// Hook receiving values the protocol could not deliver.
pub type ValueHook = Arc<dyn Fn(DroppedValue) + Send + Sync>;
/// Hook receiving errors the protocol could not deliver.
pub type ErrorHook = Arc<dyn Fn(&StreamError) + Send + Sync>;

struct GlobalHooks {
  on_discard:       Option<ValueHook>,
  on_error_dropped: Option<ErrorHook>,
  on_next_dropped:  Option<ValueHook>,
}

static GLOBAL_HOOKS: RwLock<GlobalHooks> =
  RwLock::new(GlobalHooks { on_discard: None, on_error_dropped: None, on_next_dropped: None });

/// Installs the process-wide fallback hook for discarded values.
pub fn set_on_discard(hook: ValueHook) {
  GLOBAL_HOOKS.write().on_discard = Some(hook);
}

/// Installs the process-wide fallback hook for dropped errors.
pub fn set_on_error_dropped(hook: ErrorHook) {
  GLOBAL_HOOKS.write().on_error_dropped = Some(hook);
}

/// Installs the process-wide fallback hook for dropped values.
pub fn set_on_next_dropped(hook: ValueHook) {
  GLOBAL_HOOKS.write().on_next_dropped = Some(hook);
}

/// Removes the process-wide discard hook.
pub fn reset_on_discard() {
  GLOBAL_HOOKS.write().on_discard = None;
}

/// Removes the process-wide dropped-error hook.
pub fn reset_on_error_dropped() {
  GLOBAL_HOOKS.write().on_error_dropped = None;
}

/// Removes the process-wide dropped-value hook.
pub fn reset_on_next_dropped() {
  GLOBAL_HOOKS.write().on_next_dropped = None;
}

/// Removes every process-wide hook; tests call this between cases.
pub fn reset_all_hooks() {
  let mut hooks = GLOBAL_HOOKS.write();
  hooks.on_discard = None;
  hooks.on_error_dropped = None;
  hooks.on_next_dropped = None;
}

/// Hands a produced-but-undeliverable value to the discard hook.
///
/// Lookup is context-first with the global table as fallback; without
/// either the value is simply dropped.
pub fn on_discard<T: Send + 'static>(value: T, context: &Context) {
  if let Some(hook) = context.get::<ValueHook>(DISCARD_HOOK_KEY) {
    hook(Box::new(value));
    return;
  }
  let fallback = GLOBAL_HOOKS.read().on_discard.clone();
  if let Some(hook) = fallback {
    hook(Box::new(value));
  }
}

/// Hands every element of an iterator to the discard hook.
pub fn on_discard_all<T: Send + 'static>(values: impl Iterator<Item = T>, context: &Context) {
  for value in values {
    on_discard(value, context);
  }
}

/// Reports an error that arrived after termination or cancellation.
pub fn on_error_dropped(error: &StreamError, context: &Context) {
  if let Some(hook) = context.get::<ErrorHook>(ERROR_DROPPED_HOOK_KEY) {
    hook(error);
    return;
  }
  let fallback = GLOBAL_HOOKS.read().on_error_dropped.clone();
  if let Some(hook) = fallback {
    hook(error);
    return;
  }
  #[cfg(feature = "std")]
  tracing::warn!(error = %error, "onError dropped");
}

/// Reports a value that arrived after termination or cancellation.
pub fn on_next_dropped<T: Send + 'static>(value: T, context: &Context) {
  if let Some(hook) = context.get::<ValueHook>(NEXT_DROPPED_HOOK_KEY) {
    hook(Box::new(value));
    return;
  }
  let fallback = GLOBAL_HOOKS.read().on_next_dropped.clone();
  if let Some(hook) = fallback {
    hook(Box::new(value));
    return;
  }
  #[cfg(feature = "std")]
  tracing::debug!("onNext dropped");
}

/// Routes a failure raised inside an operator callback.
///
/// Cancels the upstream subscription when one is provided, hands the
/// in-flight value to the discard hook, and returns the error to be
/// surfaced downstream. Panics are the fatal class and never reach
/// this function.
pub fn on_operator_error<T: Send + 'static>(
  subscription: Option<&dyn Subscription<T>>,
  error: StreamError,
  value: Option<T>,
  context: &Context,
) -> StreamError {
  if let Some(subscription) = subscription {
    subscription.cancel();
  }
  if let Some(value) = value {
    on_discard(value, context);
  }
  error
}

/// Returns a context carrying a discard hook.
#[must_use]
pub fn context_with_discard_hook(context: &Context, hook: ValueHook) -> Context {
  context.put(DISCARD_HOOK_KEY, hook)
}

/// Returns a context carrying a dropped-error hook.
#[must_use]
pub fn context_with_error_dropped_hook(context: &Context, hook: ErrorHook) -> Context {
  context.put(ERROR_DROPPED_HOOK_KEY, hook)
}

/// Returns a context carrying a dropped-value hook.
#[must_use]
pub fn context_with_next_dropped_hook(context: &Context, hook: ValueHook) -> Context {
  context.put(NEXT_DROPPED_HOOK_KEY, hook)
}
