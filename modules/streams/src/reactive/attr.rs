/// Introspection attribute keys.
///
/// Purely observational: answers describe a state machine's current
/// shape and have no effect on protocol correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
  /// Configured prefetch of the stage.
  Prefetch,
  /// Whether a terminal signal has been delivered downstream.
  Terminated,
  /// Whether the stage has been cancelled.
  Cancelled,
  /// Outstanding demand received from downstream.
  RequestedFromDownstream,
  /// Number of elements currently buffered.
  BufferedSize,
  /// Whether errors are delayed until every source finished.
  DelayError,
}

/// Introspection attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrValue {
  /// Boolean answer.
  Flag(bool),
  /// Counter answer.
  Count(u64),
}

/// Observational introspection over operator state machines.
pub trait Scannable {
  /// Answers one attribute, or `None` when it does not apply.
  fn scan_attr(&self, _attr: Attr) -> Option<AttrValue> {
    None
  }
}
