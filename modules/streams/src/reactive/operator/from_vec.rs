use alloc::{sync::Arc, vec::Vec};

use portable_atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use crate::reactive::{
  fusion::FusionMode, publisher::Publisher, stream_error::StreamError, subscriber::CoreSubscriber,
  subscription::Subscription, support::{add_cap_atomic, produced, validate_demand}, support::complete_only,
};

#[cfg(test)]
mod tests;

/// Array-backed source with slow/fast demand paths and sync fusion.
pub(crate) struct VecPublisher<T> {
  values: Arc<Vec<T>>,
}

impl<T: Clone + Send + Sync + 'static> VecPublisher<T> {
  pub(crate) const fn new(values: Arc<Vec<T>>) -> Self {
    Self { values }
  }
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> for VecPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    if self.values.is_empty() {
      complete_only(&subscriber);
      return;
    }
    let subscription = Arc::new(VecSubscription {
      values:     self.values.clone(),
      index:      AtomicUsize::new(0),
      requested:  AtomicU64::new(0),
      cancelled:  AtomicBool::new(false),
      fused:      AtomicBool::new(false),
      downstream: subscriber.clone(),
    });
    subscriber.on_subscribe(subscription);
  }
}

struct VecSubscription<T: Clone + Send + Sync + 'static> {
  values:     Arc<Vec<T>>,
  index:      AtomicUsize,
  requested:  AtomicU64,
  cancelled:  AtomicBool,
  fused:      AtomicBool,
  downstream: Arc<dyn CoreSubscriber<T>>,
}

impl<T: Clone + Send + Sync + 'static> VecSubscription<T> {
  fn fast_path(&self) {
    let length = self.values.len();
    let conditional = self.downstream.is_conditional();
    let mut index = self.index.load(Ordering::Relaxed);
    while index < length {
      if self.cancelled.load(Ordering::Acquire) {
        return;
      }
      let value = self.values[index].clone();
      if conditional {
        let _ = self.downstream.try_on_next(value);
      } else {
        self.downstream.on_next(value);
      }
      index += 1;
      self.index.store(index, Ordering::Relaxed);
    }
    if !self.cancelled.load(Ordering::Acquire) {
      self.downstream.on_complete();
    }
  }

  fn slow_path(&self, mut outstanding: u64) {
    let length = self.values.len();
    let conditional = self.downstream.is_conditional();
    loop {
      let mut emitted = 0_u64;
      let mut index = self.index.load(Ordering::Relaxed);
      while emitted < outstanding && index < length {
        if self.cancelled.load(Ordering::Acquire) {
          return;
        }
        let value = self.values[index].clone();
        index += 1;
        self.index.store(index, Ordering::Relaxed);
        if conditional {
          if self.downstream.try_on_next(value) {
            emitted += 1;
          }
        } else {
          self.downstream.on_next(value);
          emitted += 1;
        }
      }
      if index == length {
        if !self.cancelled.load(Ordering::Acquire) {
          self.downstream.on_complete();
        }
        return;
      }
      // Re-read the counter: more demand may have arrived while
      // emitting.
      outstanding = produced(&self.requested, emitted);
      if outstanding == 0 {
        return;
      }
      if outstanding == u64::MAX {
        self.fast_path();
        return;
      }
    }
  }
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> for VecSubscription<T> {
  fn request(&self, n: u64) {
    if let Err(error) = validate_demand(n) {
      self.downstream.on_error(error);
      return;
    }
    if self.fused.load(Ordering::Acquire) {
      return;
    }
    if add_cap_atomic(&self.requested, n) == 0 {
      if n == u64::MAX {
        self.fast_path();
      } else {
        self.slow_path(n);
      }
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
    let index = self.index.load(Ordering::Relaxed);
    if index >= self.values.len() || self.cancelled.load(Ordering::Acquire) {
      return Ok(None);
    }
    self.index.store(index + 1, Ordering::Relaxed);
    Ok(Some(self.values[index].clone()))
  }

  fn is_poll_empty(&self) -> bool {
    self.index.load(Ordering::Relaxed) >= self.values.len()
  }

  fn poll_len(&self) -> usize {
    self.values.len().saturating_sub(self.index.load(Ordering::Relaxed))
  }

  fn clear_poll(&self) {
    self.index.store(self.values.len(), Ordering::Relaxed);
  }
}
