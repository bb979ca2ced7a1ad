use super::stream_error::StreamError;

/// Materialized protocol signal.
///
/// First-class in the few operators that reason about signals as
/// values, such as `switch_on_first`.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal<T> {
  /// A value signal.
  Next(T),
  /// A failure terminal.
  Error(StreamError),
  /// A completion terminal.
  Complete,
}

impl<T> Signal<T> {
  /// Returns the carried value, if this is a value signal.
  #[must_use]
  pub const fn value(&self) -> Option<&T> {
    match self {
      | Self::Next(value) => Some(value),
      | _ => None,
    }
  }

  /// Returns the carried error, if this is a failure terminal.
  #[must_use]
  pub const fn error(&self) -> Option<&StreamError> {
    match self {
      | Self::Error(error) => Some(error),
      | _ => None,
    }
  }

  /// Returns `true` for either terminal variant.
  #[must_use]
  pub const fn is_terminal(&self) -> bool {
    !matches!(self, Self::Next(_))
  }
}
