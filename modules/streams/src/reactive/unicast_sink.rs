use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use runnel_utils_core_rs::collections::queue::{SpscLinkedQueue, SpscQueue};
use spin::Mutex;

use super::{
  attr::{Attr, AttrValue, Scannable},
  context::Context,
  fusion::FusionMode,
  hooks,
  publisher::Publisher,
  stream_error::StreamError,
  subscriber::CoreSubscriber,
  subscription::Subscription,
  support::{add_cap_atomic, error_only, produced, validate_demand},
};

#[cfg(test)]
mod tests;

/// Single-subscriber processor over an unbounded queue.
///
/// The producer side pushes values through [`UnicastSink::push`]; the
/// one allowed subscriber drains them under backpressure through a
/// work-in-progress loop. Grants `ASYNC` fusion, in which case the
/// subscriber is woken through `on_poll_ready` and polls the queue
/// directly. Windowing operators hand these out as their inner
/// sequences.
pub struct UnicastSink<T: Send + 'static> {
  weak_self:       Weak<UnicastSink<T>>,
  queue:           SpscLinkedQueue<T>,
  wip:             AtomicUsize,
  requested:       AtomicU64,
  subscriber:      Mutex<Option<Arc<dyn CoreSubscriber<T>>>>,
  subscribed_once: AtomicBool,
  cancelled:       AtomicBool,
  done:            AtomicBool,
  terminal_sent:   AtomicBool,
  fused:           AtomicBool,
  error:           Mutex<Option<StreamError>>,
}

impl<T: Send + 'static> UnicastSink<T> {
  /// Creates an idle sink.
  #[must_use]
  pub fn new() -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self:       weak_self.clone(),
      queue:           SpscLinkedQueue::new(),
      wip:             AtomicUsize::new(0),
      requested:       AtomicU64::new(0),
      subscriber:      Mutex::new(None),
      subscribed_once: AtomicBool::new(false),
      cancelled:       AtomicBool::new(false),
      done:            AtomicBool::new(false),
      terminal_sent:   AtomicBool::new(false),
      fused:           AtomicBool::new(false),
      error:           Mutex::new(None),
    })
  }

  /// Pushes one value into the sink.
  ///
  /// # Errors
  ///
  /// Hands the value back when the sink is terminated or cancelled;
  /// the caller decides whether to discard it.
  pub fn push(&self, value: T) -> Result<(), T> {
    if self.done.load(Ordering::Acquire) || self.cancelled.load(Ordering::Acquire) {
      return Err(value);
    }
    if let Err(value) = self.queue.offer(value) {
      return Err(value);
    }
    self.drain();
    Ok(())
  }

  /// Marks the sink complete; delivered once the queue drains.
  pub fn complete(&self) {
    if !self.done.swap(true, Ordering::AcqRel) {
      self.drain();
    }
  }

  /// Fails the sink; pending values are still delivered first.
  pub fn fail(&self, error: StreamError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.current_context());
      return;
    }
    *self.error.lock() = Some(error);
    self.drain();
  }

  /// Returns `true` once the single subscriber cancelled.
  #[must_use]
  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::Acquire)
  }

  /// Returns `true` when a subscriber has attached.
  #[must_use]
  pub fn has_subscriber(&self) -> bool {
    self.subscriber.lock().is_some()
  }

  fn current_context(&self) -> Context {
    self.subscriber.lock().as_ref().map_or_else(Context::empty, |subscriber| subscriber.context())
  }

  fn drain(&self) {
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    let mut missed = 1;
    loop {
      if self.cancelled.load(Ordering::Acquire) {
        let context = self.current_context();
        self.queue.clear_with(&mut |value| hooks::on_discard(value, &context));
        *self.subscriber.lock() = None;
      } else if let Some(subscriber) = self.subscriber.lock().clone() {
        if self.fused.load(Ordering::Acquire) {
          self.drain_fused(&subscriber);
        } else {
          self.drain_classic(&subscriber);
        }
      }
      missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
      if missed == 0 {
        return;
      }
    }
  }

  fn drain_fused(&self, subscriber: &Arc<dyn CoreSubscriber<T>>) {
    if !self.queue.is_empty() {
      subscriber.on_poll_ready();
    }
    if self.done.load(Ordering::Acquire) && !self.terminal_sent.swap(true, Ordering::AcqRel) {
      match self.error.lock().take() {
        | Some(error) => subscriber.on_error(error),
        | None => subscriber.on_complete(),
      }
    }
  }

  fn drain_classic(&self, subscriber: &Arc<dyn CoreSubscriber<T>>) {
    loop {
      let mut emitted = 0_u64;
      let requested = self.requested.load(Ordering::Acquire);
      while emitted < requested {
        if self.cancelled.load(Ordering::Acquire) {
          return;
        }
        match self.queue.poll() {
          | Some(value) => {
            subscriber.on_next(value);
            emitted += 1;
          },
          | None => break,
        }
      }
      if emitted > 0 {
        produced(&self.requested, emitted);
      }
      if self.queue.is_empty() && self.done.load(Ordering::Acquire) {
        if !self.terminal_sent.swap(true, Ordering::AcqRel) {
          match self.error.lock().take() {
            | Some(error) => subscriber.on_error(error),
            | None => subscriber.on_complete(),
          }
        }
        return;
      }
      if emitted == 0 || self.queue.is_empty() {
        return;
      }
    }
  }
}

impl<T: Send + 'static> Publisher<T> for UnicastSink<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    if self.subscribed_once.swap(true, Ordering::AcqRel) {
      error_only(&subscriber, StreamError::InnerAlreadySubscribed);
      return;
    }
    let Some(sink) = self.weak_self.upgrade() else {
      return;
    };
    *self.subscriber.lock() = Some(subscriber.clone());
    subscriber.on_subscribe(Arc::new(UnicastSinkSubscription { sink }));
    self.drain();
  }
}

struct UnicastSinkSubscription<T: Send + 'static> {
  sink: Arc<UnicastSink<T>>,
}

impl<T: Send + 'static> Subscription<T> for UnicastSinkSubscription<T> {
  fn request(&self, n: u64) {
    if let Err(error) = validate_demand(n) {
      if let Some(subscriber) = self.sink.subscriber.lock().clone() {
        subscriber.on_error(error);
      }
      return;
    }
    add_cap_atomic(&self.sink.requested, n);
    self.sink.drain();
  }

  fn cancel(&self) {
    if !self.sink.cancelled.swap(true, Ordering::AcqRel) {
      self.sink.drain();
    }
  }

  fn request_fusion(&self, mask: FusionMode) -> FusionMode {
    if mask.allows_async() {
      self.sink.fused.store(true, Ordering::Release);
      FusionMode::ASYNC
    } else {
      FusionMode::NONE
    }
  }

  fn poll(&self) -> Result<Option<T>, StreamError> {
    Ok(self.sink.queue.poll())
  }

  fn is_poll_empty(&self) -> bool {
    self.sink.queue.is_empty()
  }

  fn poll_len(&self) -> usize {
    self.sink.queue.len()
  }

  fn clear_poll(&self) {
    let context = self.sink.current_context();
    self.sink.queue.clear_with(&mut |value| hooks::on_discard(value, &context));
  }
}

impl<T: Send + 'static> Scannable for UnicastSink<T> {
  fn scan_attr(&self, attr: Attr) -> Option<AttrValue> {
    match attr {
      | Attr::BufferedSize => Some(AttrValue::Count(self.queue.len() as u64)),
      | Attr::Terminated => Some(AttrValue::Flag(self.terminal_sent.load(Ordering::Acquire))),
      | Attr::Cancelled => Some(AttrValue::Flag(self.is_cancelled())),
      | Attr::RequestedFromDownstream => Some(AttrValue::Count(self.requested.load(Ordering::Acquire))),
      | _ => None,
    }
  }
}
