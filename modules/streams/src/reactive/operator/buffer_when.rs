use alloc::{sync::Arc, vec::Vec};

use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

use crate::reactive::{
  attr::{Attr, AttrValue, Scannable},
  context::Context,
  deferred_subscription::DeferredSubscription,
  hooks,
  publisher::Publisher,
  serialized_subscriber::SerializedSubscriber,
  stream_error::StreamError,
  subscriber::CoreSubscriber,
  subscription::Subscription,
  support::{add_cap_atomic, produced, validate_demand},
};

#[cfg(test)]
mod tests;

/// Collects values into buffers delimited by a boundary sequence.
///
/// The open buffer lives inside an operator-local critical section.
/// Each boundary signal swaps in a fresh buffer and emits the old one
/// when non-empty; emitting with zero downstream demand is an overflow
/// error. Main completion closes the machine, cancels the boundary,
/// and flushes the final buffer.
pub(crate) struct BufferWhenPublisher<T: Send + 'static, U: Send + 'static> {
  source:   Arc<dyn Publisher<T>>,
  boundary: Arc<dyn Publisher<U>>,
}

impl<T: Send + 'static, U: Send + 'static> BufferWhenPublisher<T, U> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, boundary: Arc<dyn Publisher<U>>) -> Self {
    Self { source, boundary }
  }
}

impl<T: Send + 'static, U: Send + 'static> Publisher<Vec<T>> for BufferWhenPublisher<T, U> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<Vec<T>>>) {
    let serialized: Arc<dyn CoreSubscriber<Vec<T>>> = Arc::new(SerializedSubscriber::new(subscriber));
    let main = BufferBoundaryMain::new(serialized);
    main.downstream.on_subscribe(main.clone());
    self.boundary.subscribe(Arc::new(BufferBoundaryOther { main: main.clone() }));
    self.source.subscribe(main);
  }
}

struct BufferBoundaryMain<T: Send + 'static, U: Send + 'static> {
  downstream: Arc<dyn CoreSubscriber<Vec<T>>>,
  // `None` means the machine is closing; late values are dropped.
  current:    Mutex<Option<Vec<T>>>,
  requested:  AtomicU64,
  upstream:   DeferredSubscription<T>,
  boundary:   DeferredSubscription<U>,
  done:       AtomicBool,
}

impl<T: Send + 'static, U: Send + 'static> BufferBoundaryMain<T, U> {
  fn new(downstream: Arc<dyn CoreSubscriber<Vec<T>>>) -> Arc<Self> {
    Arc::new(Self {
      downstream,
      current: Mutex::new(Some(Vec::new())),
      requested: AtomicU64::new(0),
      upstream: DeferredSubscription::new(),
      boundary: DeferredSubscription::new(),
      done: AtomicBool::new(false),
    })
  }

  /// Delivers one closed buffer, or terminates with an overflow error
  /// when downstream demand is exhausted.
  ///
  /// The overflow terminal is delivered directly rather than through
  /// [`BufferBoundaryMain::fail`]: the completion path has already
  /// marked the machine done by the time the final buffer is emitted,
  /// and the error must still reach the downstream exactly once.
  fn emit(&self, buffer: Vec<T>) -> bool {
    if self.requested.load(Ordering::Acquire) > 0 {
      produced(&self.requested, 1);
      self.downstream.on_next(buffer);
      return true;
    }
    let context = self.downstream.context();
    hooks::on_discard_all(buffer.into_iter(), &context);
    let pending = self.current.lock().take();
    if let Some(open) = pending {
      hooks::on_discard_all(open.into_iter(), &context);
    }
    self.done.store(true, Ordering::Release);
    self.upstream.cancel();
    self.boundary.cancel();
    self.downstream.on_error(StreamError::Overflow { stage: "buffer_when" });
    false
  }

  /// Boundary tick: swap in a fresh buffer, emit the old one.
  fn boundary_next(&self) {
    let swapped = {
      let mut current = self.current.lock();
      match current.take() {
        | Some(old) => {
          *current = Some(Vec::new());
          Some(old)
        },
        | None => None,
      }
    };
    let Some(buffer) = swapped else {
      return;
    };
    if !buffer.is_empty() {
      self.emit(buffer);
    }
  }

  fn fail(&self, error: StreamError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.downstream.context());
      return;
    }
    let pending = self.current.lock().take();
    if let Some(buffer) = pending {
      let context = self.downstream.context();
      hooks::on_discard_all(buffer.into_iter(), &context);
    }
    self.upstream.cancel();
    self.boundary.cancel();
    self.downstream.on_error(error);
  }

  fn finish(&self) {
    if self.done.swap(true, Ordering::AcqRel) {
      return;
    }
    let pending = self.current.lock().take();
    self.upstream.cancel();
    self.boundary.cancel();
    match pending {
      | Some(buffer) if !buffer.is_empty() => {
        if self.emit(buffer) {
          self.downstream.on_complete();
        }
      },
      | _ => self.downstream.on_complete(),
    }
  }
}

impl<T: Send + 'static, U: Send + 'static> CoreSubscriber<T> for BufferBoundaryMain<T, U> {
  fn context(&self) -> Context {
    self.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    if self.upstream.set(subscription) {
      self.upstream.request(u64::MAX);
    }
  }

  fn on_next(&self, value: T) {
    {
      let mut current = self.current.lock();
      if let Some(buffer) = current.as_mut() {
        buffer.push(value);
        return;
      }
    }
    hooks::on_next_dropped(value, &self.context());
  }

  fn on_error(&self, error: StreamError) {
    self.fail(error);
  }

  fn on_complete(&self) {
    self.finish();
  }
}

impl<T: Send + 'static, U: Send + 'static> Subscription<Vec<T>> for BufferBoundaryMain<T, U> {
  fn request(&self, n: u64) {
    if let Err(error) = validate_demand(n) {
      self.fail(error);
      return;
    }
    add_cap_atomic(&self.requested, n);
  }

  fn cancel(&self) {
    if self.done.swap(true, Ordering::AcqRel) {
      return;
    }
    self.upstream.cancel();
    self.boundary.cancel();
    let pending = self.current.lock().take();
    if let Some(buffer) = pending {
      let context = self.downstream.context();
      hooks::on_discard_all(buffer.into_iter(), &context);
    }
  }
}

impl<T: Send + 'static, U: Send + 'static> Scannable for BufferBoundaryMain<T, U> {
  fn scan_attr(&self, attr: Attr) -> Option<AttrValue> {
    match attr {
      | Attr::Terminated => Some(AttrValue::Flag(self.done.load(Ordering::Acquire))),
      | Attr::Cancelled => Some(AttrValue::Flag(self.upstream.is_cancelled())),
      | Attr::BufferedSize => {
        Some(AttrValue::Count(self.current.lock().as_ref().map_or(0, Vec::len) as u64))
      },
      | Attr::RequestedFromDownstream => Some(AttrValue::Count(self.requested.load(Ordering::Acquire))),
      | _ => None,
    }
  }
}

struct BufferBoundaryOther<T: Send + 'static, U: Send + 'static> {
  main: Arc<BufferBoundaryMain<T, U>>,
}

impl<T: Send + 'static, U: Send + 'static> CoreSubscriber<U> for BufferBoundaryOther<T, U> {
  fn context(&self) -> Context {
    self.main.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<U>>) {
    if self.main.boundary.set(subscription) {
      self.main.boundary.request(u64::MAX);
    }
  }

  fn on_next(&self, _boundary: U) {
    self.main.boundary_next();
  }

  fn on_error(&self, error: StreamError) {
    self.main.fail(error);
  }

  fn on_complete(&self) {
    self.main.finish();
  }
}
