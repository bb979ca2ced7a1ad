use alloc::sync::Arc;

use portable_atomic::{AtomicBool, AtomicU64, Ordering};

use crate::reactive::{
  fusion::FusionMode, publisher::Publisher, stream_error::StreamError, subscriber::CoreSubscriber,
  subscription::Subscription, support::{add_cap_atomic, complete_only, produced, validate_demand},
};


/// Counter source emitting `count` consecutive integers.
pub(crate) struct RangePublisher {
  start: u64,
  count: u64,
}

impl RangePublisher {
  pub(crate) const fn new(start: u64, count: u64) -> Self {
    Self { start, count }
  }
}

impl Publisher<u64> for RangePublisher {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<u64>>) {
    if self.count == 0 {
      complete_only(&subscriber);
      return;
    }
    let subscription = Arc::new(RangeSubscription {
      cursor:     AtomicU64::new(self.start),
      end:        self.start.saturating_add(self.count),
      requested:  AtomicU64::new(0),
      cancelled:  AtomicBool::new(false),
      fused:      AtomicBool::new(false),
      downstream: subscriber.clone(),
    });
    subscriber.on_subscribe(subscription);
  }
}

struct RangeSubscription {
  cursor:     AtomicU64,
  end:        u64,
  requested:  AtomicU64,
  cancelled:  AtomicBool,
  fused:      AtomicBool,
  downstream: Arc<dyn CoreSubscriber<u64>>,
}

impl RangeSubscription {
  fn fast_path(&self) {
    let conditional = self.downstream.is_conditional();
    let mut cursor = self.cursor.load(Ordering::Relaxed);
    while cursor < self.end {
      if self.cancelled.load(Ordering::Acquire) {
        return;
      }
      if conditional {
        let _ = self.downstream.try_on_next(cursor);
      } else {
        self.downstream.on_next(cursor);
      }
      cursor += 1;
      self.cursor.store(cursor, Ordering::Relaxed);
    }
    if !self.cancelled.load(Ordering::Acquire) {
      self.downstream.on_complete();
    }
  }

  fn slow_path(&self, mut outstanding: u64) {
    let conditional = self.downstream.is_conditional();
    loop {
      let mut emitted = 0_u64;
      let mut cursor = self.cursor.load(Ordering::Relaxed);
      while emitted < outstanding && cursor < self.end {
        if self.cancelled.load(Ordering::Acquire) {
          return;
        }
        let value = cursor;
        cursor += 1;
        self.cursor.store(cursor, Ordering::Relaxed);
        if conditional {
          if self.downstream.try_on_next(value) {
            emitted += 1;
          }
        } else {
          self.downstream.on_next(value);
          emitted += 1;
        }
      }
      if cursor == self.end {
        if !self.cancelled.load(Ordering::Acquire) {
          self.downstream.on_complete();
        }
        return;
      }
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

impl Subscription<u64> for RangeSubscription {
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

  fn poll(&self) -> Result<Option<u64>, StreamError> {
    let cursor = self.cursor.load(Ordering::Relaxed);
    if cursor >= self.end || self.cancelled.load(Ordering::Acquire) {
      return Ok(None);
    }
    self.cursor.store(cursor + 1, Ordering::Relaxed);
    Ok(Some(cursor))
  }

  fn is_poll_empty(&self) -> bool {
    self.cursor.load(Ordering::Relaxed) >= self.end
  }

  fn poll_len(&self) -> usize {
    (self.end.saturating_sub(self.cursor.load(Ordering::Relaxed))) as usize
  }

  fn clear_poll(&self) {
    self.cursor.store(self.end, Ordering::Relaxed);
  }
}
