use alloc::{sync::{Arc, Weak}, vec::Vec};

use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

use crate::reactive::{
  attr::{Attr, AttrValue, Scannable},
  context::Context,
  deferred_subscription::DeferredSubscription,
  hooks,
  publisher::Publisher,
  stream_error::StreamError,
  subscriber::CoreSubscriber,
  subscription::Subscription,
  support::{add_cap_atomic, produced, validate_demand},
};

#[cfg(test)]
mod tests;

/// Collects values into fixed-size vectors.
///
/// One downstream buffer of demand converts to `size` upstream values.
pub(crate) struct BufferCountPublisher<T: Send + 'static> {
  source: Arc<dyn Publisher<T>>,
  size:   usize,
}

impl<T: Send + 'static> BufferCountPublisher<T> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, size: usize) -> Self {
    Self { source, size: size.max(1) }
  }
}

impl<T: Send + 'static> Publisher<Vec<T>> for BufferCountPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<Vec<T>>>) {
    self.source.subscribe(BufferCountSubscriber::new(subscriber, self.size));
  }
}

struct BufferCountSubscriber<T: Send + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<Vec<T>>>,
  size:       usize,
  current:    Mutex<Vec<T>>,
  requested:  AtomicU64,
  upstream:   DeferredSubscription<T>,
  done:       AtomicBool,
}

impl<T: Send + 'static> BufferCountSubscriber<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<Vec<T>>>, size: usize) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      size,
      current: Mutex::new(Vec::new()),
      requested: AtomicU64::new(0),
      upstream: DeferredSubscription::new(),
      done: AtomicBool::new(false),
    })
  }

  fn emit(&self, buffer: Vec<T>) -> bool {
    if self.requested.load(Ordering::Acquire) > 0 {
      produced(&self.requested, 1);
      self.downstream.on_next(buffer);
      true
    } else {
      let context = self.context();
      hooks::on_discard_all(buffer.into_iter(), &context);
      self.upstream.cancel();
      self.downstream.on_error(StreamError::Overflow { stage: "buffer_count" });
      false
    }
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for BufferCountSubscriber<T> {
  fn context(&self) -> Context {
    self.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    if !self.upstream.set(subscription) {
      return;
    }
    if let Some(this) = self.weak_self.upgrade() {
      self.downstream.on_subscribe(this);
    }
  }

  fn on_next(&self, value: T) {
    if self.done.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    let full = {
      let mut current = self.current.lock();
      current.push(value);
      if current.len() == self.size {
        Some(core::mem::take(&mut *current))
      } else {
        None
      }
    };
    if let Some(buffer) = full {
      if !self.emit(buffer) {
        self.done.store(true, Ordering::Release);
      }
    }
  }

  fn on_error(&self, error: StreamError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.context());
      return;
    }
    let pending = core::mem::take(&mut *self.current.lock());
    let context = self.context();
    hooks::on_discard_all(pending.into_iter(), &context);
    self.downstream.on_error(error);
  }

  fn on_complete(&self) {
    if self.done.swap(true, Ordering::AcqRel) {
      return;
    }
    let pending = core::mem::take(&mut *self.current.lock());
    if pending.is_empty() || self.emit(pending) {
      self.downstream.on_complete();
    }
  }
}

impl<T: Send + 'static> Subscription<Vec<T>> for BufferCountSubscriber<T> {
  fn request(&self, n: u64) {
    if let Err(error) = validate_demand(n) {
      self.downstream.on_error(error);
      return;
    }
    add_cap_atomic(&self.requested, n);
    self.upstream.request(n.saturating_mul(self.size as u64));
  }

  fn cancel(&self) {
    self.upstream.cancel();
    let pending = core::mem::take(&mut *self.current.lock());
    let context = self.context();
    hooks::on_discard_all(pending.into_iter(), &context);
  }
}

impl<T: Send + 'static> Scannable for BufferCountSubscriber<T> {
  fn scan_attr(&self, attr: Attr) -> Option<AttrValue> {
    match attr {
      | Attr::Prefetch => Some(AttrValue::Count(self.size as u64)),
      | Attr::Terminated => Some(AttrValue::Flag(self.done.load(Ordering::Acquire))),
      | Attr::Cancelled => Some(AttrValue::Flag(self.upstream.is_cancelled())),
      | Attr::BufferedSize => Some(AttrValue::Count(self.current.lock().len() as u64)),
      | Attr::RequestedFromDownstream => Some(AttrValue::Count(self.requested.load(Ordering::Acquire))),
      | _ => None,
    }
  }
}
