use alloc::{vec, vec::Vec};
use core::{fmt, time::Duration};

use super::user_error::UserError;

#[cfg(test)]
mod tests;

/// Errors travelling through the stream protocol.
///
/// Every variant is cloneable so terminal signals can be multicast and
/// replayed. Panics are deliberately absent from this taxonomy: a panic
/// in user code is the fatal class and unwinds through the operator
/// untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamError {
  /// A `request` carried a non-positive demand amount.
  InvalidDemand {
    /// Requested demand amount.
    requested: u64,
  },
  /// A subscriber with an established subscription received another.
  DoubleSubscribe,
  /// An element was produced while downstream demand was exhausted.
  Overflow {
    /// Stage that could not honour its demand contract.
    stage: &'static str,
  },
  /// The subscription was cancelled before a value could be delivered.
  Cancelled,
  /// No signal arrived within the configured window.
  Timeout {
    /// The window that elapsed.
    after: Duration,
  },
  /// A task could not be scheduled because the executor is disposed.
  SchedulerRejected,
  /// A single-subscriber stage observed a second subscriber.
  InnerAlreadySubscribed,
  /// A failure raised by user code.
  User(UserError),
  /// Several failures observed during composite termination.
  Composite(Vec<StreamError>),
}

impl StreamError {
  /// Wraps an arbitrary user error.
  pub fn user<E>(error: E) -> Self
  where
    E: core::error::Error + Send + Sync + 'static, {
    Self::User(UserError::new(error))
  }

  /// Builds a user error from a plain message.
  #[must_use]
  pub fn message(text: &'static str) -> Self {
    Self::User(UserError::new(MessageError { text }))
  }

  /// Combines this error with a later one into a composite chain.
  ///
  /// Used when a cleanup step fails while the main sequence is already
  /// terminating: the original error stays first, suppressed failures
  /// follow in arrival order.
  #[must_use]
  pub fn with_suppressed(self, suppressed: Self) -> Self {
    match self {
      | Self::Composite(mut chain) => {
        chain.push(suppressed);
        Self::Composite(chain)
      },
      | primary => Self::Composite(vec![primary, suppressed]),
    }
  }
}

impl fmt::Display for StreamError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::InvalidDemand { requested } => write!(f, "request must be positive: {requested}"),
      | Self::DoubleSubscribe => write!(f, "subscription already set"),
      | Self::Overflow { stage } => write!(f, "could not emit value due to lack of requests in {stage}"),
      | Self::Cancelled => write!(f, "subscription cancelled"),
      | Self::Timeout { after } => write!(f, "no signal within {}ms", after.as_millis()),
      | Self::SchedulerRejected => write!(f, "scheduler rejected the task"),
      | Self::InnerAlreadySubscribed => write!(f, "stage allows only one subscriber"),
      | Self::User(error) => fmt::Display::fmt(error, f),
      | Self::Composite(chain) => {
        write!(f, "multiple errors:")?;
        for error in chain {
          write!(f, " [{error}]")?;
        }
        Ok(())
      },
    }
  }
}

impl core::error::Error for StreamError {}

/// Plain-text user error used by [`StreamError::message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MessageError {
  text: &'static str,
}

impl fmt::Display for MessageError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.text)
  }
}

impl core::error::Error for MessageError {}
