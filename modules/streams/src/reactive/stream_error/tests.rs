use alloc::string::ToString;
use core::time::Duration;

use super::StreamError;

#[test]
fn error_messages_are_stable() {
  assert_eq!(StreamError::InvalidDemand { requested: 0 }.to_string(), "request must be positive: 0");
  assert_eq!(StreamError::DoubleSubscribe.to_string(), "subscription already set");
  assert_eq!(StreamError::Cancelled.to_string(), "subscription cancelled");
  assert_eq!(StreamError::Timeout { after: Duration::from_millis(10) }.to_string(), "no signal within 10ms");
  assert_eq!(StreamError::message("boom").to_string(), "boom");
}

#[test]
fn user_errors_compare_by_identity() {
  let first = StreamError::message("boom");
  let clone = first.clone();
  let second = StreamError::message("boom");
  assert_eq!(first, clone);
  assert_ne!(first, second);
}

#[test]
fn suppressed_errors_chain_in_order() {
  let chained = StreamError::message("main").with_suppressed(StreamError::message("cleanup"));
  match &chained {
    | StreamError::Composite(chain) => {
      assert_eq!(chain.len(), 2);
      assert_eq!(chain[0].to_string(), "main");
      assert_eq!(chain[1].to_string(), "cleanup");
    },
    | other => panic!("expected composite, got {other:?}"),
  }
  let longer = chained.with_suppressed(StreamError::Cancelled);
  match longer {
    | StreamError::Composite(chain) => assert_eq!(chain.len(), 3),
    | other => panic!("expected composite, got {other:?}"),
  }
}
