use alloc::sync::Arc;

use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

use crate::reactive::{
  fusion::FusionMode, publisher::Publisher, stream_error::StreamError, subscriber::CoreSubscriber,
  subscription::Subscription, support::{add_cap_atomic, complete_only, produced, validate_demand},
};

/// Iterable-backed source.
///
/// The iterable is cloned per subscription, so the sequence is
/// re-subscribable like every other source.
pub(crate) struct IterPublisher<I> {
  iterable: I,
}

impl<T, I> IterPublisher<I>
where
  T: Send + 'static,
  I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
  I::IntoIter: Send,
{
  pub(crate) const fn new(iterable: I) -> Self {
    Self { iterable }
  }
}

impl<T, I> Publisher<T> for IterPublisher<I>
where
  T: Send + 'static,
  I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
  I::IntoIter: Send,
{
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    let mut iter = self.iterable.clone().into_iter().peekable();
    if iter.peek().is_none() {
      complete_only(&subscriber);
      return;
    }
    let subscription = Arc::new(IterSubscription {
      iter:       Mutex::new(iter),
      requested:  AtomicU64::new(0),
      cancelled:  AtomicBool::new(false),
      fused:      AtomicBool::new(false),
      downstream: subscriber.clone(),
    });
    subscriber.on_subscribe(subscription);
  }
}

struct IterSubscription<T: Send + 'static, I: Iterator<Item = T> + Send> {
  iter:       Mutex<core::iter::Peekable<I>>,
  requested:  AtomicU64,
  cancelled:  AtomicBool,
  fused:      AtomicBool,
  downstream: Arc<dyn CoreSubscriber<T>>,
}

impl<T: Send + 'static, I: Iterator<Item = T> + Send> IterSubscription<T, I> {
  fn drive(&self, mut outstanding: u64) {
    let conditional = self.downstream.is_conditional();
    loop {
      let mut emitted = 0_u64;
      while outstanding == u64::MAX || emitted < outstanding {
        if self.cancelled.load(Ordering::Acquire) {
          return;
        }
        let next = self.iter.lock().next();
        let Some(value) = next else {
          if !self.cancelled.load(Ordering::Acquire) {
            self.downstream.on_complete();
          }
          return;
        };
        if conditional {
          if self.downstream.try_on_next(value) {
            emitted += 1;
          }
        } else {
          self.downstream.on_next(value);
          emitted += 1;
        }
      }
      if self.iter.lock().peek().is_none() {
        if !self.cancelled.load(Ordering::Acquire) {
          self.downstream.on_complete();
        }
        return;
      }
      outstanding = produced(&self.requested, emitted);
      if outstanding == 0 {
        return;
      }
    }
  }
}

impl<T: Send + 'static, I: Iterator<Item = T> + Send> Subscription<T> for IterSubscription<T, I> {
  fn request(&self, n: u64) {
    if let Err(error) = validate_demand(n) {
      self.downstream.on_error(error);
      return;
    }
    if self.fused.load(Ordering::Acquire) {
      return;
    }
    if add_cap_atomic(&self.requested, n) == 0 {
      self.drive(n);
    }
  }

  fn cancel(&self) {
    self.cancelled.store(true, Ordering::Release);
  }

  fn request_fusion(&self, mask: FusionMode) -> FusionMode {
    if mask.allows_sync() {
      self.fused.store(true, Ordering::Release);
      FusionMode::SYNC
    } else {
      FusionMode::NONE
    }
  }

  fn poll(&self) -> Result<Option<T>, StreamError> {
    if self.cancelled.load(Ordering::Acquire) {
      return Ok(None);
    }
    Ok(self.iter.lock().next())
  }

  fn is_poll_empty(&self) -> bool {
    self.iter.lock().peek().is_none()
  }

  fn clear_poll(&self) {
    self.cancel();
  }
}
