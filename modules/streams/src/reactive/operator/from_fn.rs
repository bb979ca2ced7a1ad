use alloc::sync::Arc;

use portable_atomic::{AtomicU8, Ordering};

use crate::reactive::{
  fusion::FusionMode, publisher::Publisher, stream_error::StreamError, subscriber::CoreSubscriber,
  subscription::Subscription, support::validate_demand,
};


type Callable<T> = Arc<dyn Fn() -> Result<Option<T>, StreamError> + Send + Sync>;

/// Source producing at most one value through a callable.
///
/// The callable runs lazily: on the first request, or inside `poll`
/// when the downstream negotiated sync fusion. Cancelling before that
/// point means it never runs.
pub(crate) struct CallablePublisher<T: Send + 'static> {
  callable: Callable<T>,
}

impl<T: Send + 'static> CallablePublisher<T> {
  pub(crate) fn new(callable: Callable<T>) -> Self {
    Self { callable }
  }
}

impl<T: Send + 'static> Publisher<T> for CallablePublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    let subscription = Arc::new(CallableSubscription {
      callable:   self.callable.clone(),
      state:      AtomicU8::new(IDLE),
      downstream: subscriber.clone(),
    });
    subscriber.on_subscribe(subscription);
  }
}

const IDLE: u8 = 0;
const CLAIMED: u8 = 1;
const CANCELLED: u8 = 2;

struct CallableSubscription<T: Send + 'static> {
  callable:   Callable<T>,
  state:      AtomicU8,
  downstream: Arc<dyn CoreSubscriber<T>>,
}

impl<T: Send + 'static> CallableSubscription<T> {
  fn claim(&self) -> bool {
    self.state.compare_exchange(IDLE, CLAIMED, Ordering::AcqRel, Ordering::Acquire).is_ok()
  }
}

impl<T: Send + 'static> Subscription<T> for CallableSubscription<T> {
  fn request(&self, n: u64) {
    if let Err(error) = validate_demand(n) {
      if self.claim() {
        self.downstream.on_error(error);
      }
      return;
    }
    if !self.claim() {
      return;
    }
    match (self.callable)() {
      | Ok(Some(value)) => {
        self.downstream.on_next(value);
        if self.state.load(Ordering::Acquire) != CANCELLED {
          self.downstream.on_complete();
        }
      },
      | Ok(None) => self.downstream.on_complete(),
      | Err(error) => self.downstream.on_error(error),
    }
  }

  fn cancel(&self) {
    self.state.swap(CANCELLED, Ordering::AcqRel);
  }

  fn request_fusion(&self, mask: FusionMode) -> FusionMode {
    if mask.allows_sync() {
      FusionMode::SYNC
    } else {
      FusionMode::NONE
    }
  }

  fn poll(&self) -> Result<Option<T>, StreamError> {
    if !self.claim() {
      return Ok(None);
    }
    (self.callable)()
  }

  fn is_poll_empty(&self) -> bool {
    self.state.load(Ordering::Acquire) != IDLE
  }

  fn poll_len(&self) -> usize {
    usize::from(!self.is_poll_empty())
  }

  fn clear_poll(&self) {
    self.cancel();
  }
}
