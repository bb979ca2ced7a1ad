use core::fmt;

#[cfg(test)]
mod tests;

/// Bit mask describing the fusion contract between adjacent operators.
///
/// A downstream subscriber asks its upstream subscription for a set of
/// acceptable modes; the upstream answers with [`FusionMode::NONE`] or
/// a subset of the request. Under `SYNC` the downstream drives delivery
/// entirely through `poll`; under `ASYNC` the upstream signals
/// readiness through the poll-ready wake and the downstream drains on
/// its own thread. `THREAD_BARRIER` marks a request that must not be
/// fused across an executor boundary.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FusionMode(u8);

impl FusionMode {
  /// Classical signal-based delivery.
  pub const NONE: Self = Self(0);
  /// Values are produced on demand inside `poll`.
  pub const SYNC: Self = Self(1);
  /// Values are queued and drained after a poll-ready wake.
  pub const ASYNC: Self = Self(1 << 1);
  /// Either fused mode is acceptable.
  pub const ANY: Self = Self(1 | 1 << 1);
  /// Fusion must not cross an executor boundary.
  pub const THREAD_BARRIER: Self = Self(1 << 2);

  /// Returns `true` when every bit of `other` is present in `self`.
  #[must_use]
  pub const fn contains(self, other: Self) -> bool {
    self.0 & other.0 == other.0
  }

  /// Returns the union of both masks.
  #[must_use]
  pub const fn union(self, other: Self) -> Self {
    Self(self.0 | other.0)
  }

  /// Returns `self` with the bits of `other` removed.
  #[must_use]
  pub const fn without(self, other: Self) -> Self {
    Self(self.0 & !other.0)
  }

  /// Returns `true` for the empty mask.
  #[must_use]
  pub const fn is_none(self) -> bool {
    self.0 == 0
  }

  /// Returns `true` when a sync grant may be answered: the requester
  /// asked for `SYNC` and did not raise the thread barrier.
  #[must_use]
  pub const fn allows_sync(self) -> bool {
    self.contains(Self::SYNC) && !self.contains(Self::THREAD_BARRIER)
  }

  /// Returns `true` when an async grant may be answered.
  #[must_use]
  pub const fn allows_async(self) -> bool {
    self.contains(Self::ASYNC) && !self.contains(Self::THREAD_BARRIER)
  }

  /// Returns the raw bits; state machines persist granted modes in
  /// atomics.
  #[must_use]
  pub const fn bits(self) -> u8 {
    self.0
  }

  /// Rebuilds a mode from raw bits.
  #[must_use]
  pub const fn from_bits(bits: u8) -> Self {
    Self(bits)
  }
}

impl fmt::Debug for FusionMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match *self {
      | Self::NONE => f.write_str("NONE"),
      | Self::SYNC => f.write_str("SYNC"),
      | Self::ASYNC => f.write_str("ASYNC"),
      | Self::ANY => f.write_str("ANY"),
      | other => write!(f, "FusionMode({:#b})", other.0),
    }
  }
}
