/// Cancellable resource handle.
///
/// Disposal is cooperative and idempotent.
pub trait Disposable: Send + Sync {
  /// Releases the resource; later calls are no-ops.
  fn dispose(&self);

  /// Returns `true` once disposed.
  fn is_disposed(&self) -> bool;
}
