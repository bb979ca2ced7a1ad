use alloc::sync::Arc;
use core::{any::Any, fmt};

#[cfg(test)]
mod tests;

/// Key of the context-local discarded-value hook.
pub(super) const DISCARD_HOOK_KEY: &str = "runnel.on-discard";
/// Key of the context-local dropped-error hook.
pub(super) const ERROR_DROPPED_HOOK_KEY: &str = "runnel.on-error-dropped";
/// Key of the context-local dropped-value hook.
pub(super) const NEXT_DROPPED_HOOK_KEY: &str = "runnel.on-next-dropped";

/// Immutable map propagated sink-to-source during subscription.
///
/// Writing returns a new context; readers on the source side only ever
/// observe the value set at subscribe time. Entries form a persistent
/// chain, so `put` is O(1) and lookups walk at most the handful of
/// entries a pipeline realistically carries.
#[derive(Clone, Default)]
pub struct Context {
  head: Option<Arc<ContextEntry>>,
}

struct ContextEntry {
  key:    &'static str,
  value:  Arc<dyn Any + Send + Sync>,
  parent: Option<Arc<ContextEntry>>,
}

impl Context {
  /// Returns the empty context.
  #[must_use]
  pub const fn empty() -> Self {
    Self { head: None }
  }

  /// Returns a context extended with one entry, shadowing any earlier
  /// entry under the same key.
  #[must_use]
  pub fn put<V>(&self, key: &'static str, value: V) -> Self
  where
    V: Any + Send + Sync, {
    self.put_shared(key, Arc::new(value))
  }

  /// Returns a context extended with an already shared entry.
  #[must_use]
  pub fn put_shared(&self, key: &'static str, value: Arc<dyn Any + Send + Sync>) -> Self {
    Self { head: Some(Arc::new(ContextEntry { key, value, parent: self.head.clone() })) }
  }

  /// Looks up an entry by key and concrete type.
  #[must_use]
  pub fn get<V>(&self, key: &'static str) -> Option<Arc<V>>
  where
    V: Any + Send + Sync, {
    self.get_raw(key).and_then(|value| value.downcast::<V>().ok())
  }

  /// Looks up an entry by key without downcasting.
  #[must_use]
  pub fn get_raw(&self, key: &'static str) -> Option<Arc<dyn Any + Send + Sync>> {
    let mut cursor = self.head.as_ref();
    while let Some(entry) = cursor {
      if entry.key == key {
        return Some(entry.value.clone());
      }
      cursor = entry.parent.as_ref();
    }
    None
  }

  /// Returns `true` when the key is present.
  #[must_use]
  pub fn contains(&self, key: &'static str) -> bool {
    self.get_raw(key).is_some()
  }

  /// Returns `true` when no entry has ever been written.
  #[must_use]
  pub const fn is_empty(&self) -> bool {
    self.head.is_none()
  }
}

impl fmt::Debug for Context {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut list = f.debug_list();
    let mut cursor = self.head.as_ref();
    while let Some(entry) = cursor {
      list.entry(&entry.key);
      cursor = entry.parent.as_ref();
    }
    list.finish()
  }
}
