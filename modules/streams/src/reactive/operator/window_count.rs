use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, flux::Flux, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription, unicast_sink::UnicastSink,
  support::{add_cap_atomic, produced, validate_demand},
};


/// Splits the sequence into consecutive windows of `size` values.
///
/// Each window is a unicast inner sequence; one downstream request
/// admits one window, which converts to `size` upstream values.
pub(crate) struct WindowCountPublisher<T: Send + 'static> {
  source: Arc<dyn Publisher<T>>,
  size:   usize,
}

impl<T: Send + 'static> WindowCountPublisher<T> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, size: usize) -> Self {
    Self { source, size: size.max(1) }
  }
}

impl<T: Send + 'static> Publisher<Flux<T>> for WindowCountPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<Flux<T>>>) {
    self.source.subscribe(WindowCountSubscriber::new(subscriber, self.size));
  }
}

struct ActiveWindow<T: Send + 'static> {
  sink:  Arc<UnicastSink<T>>,
  count: usize,
}

struct WindowCountSubscriber<T: Send + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<Flux<T>>>,
  size:       usize,
  active:     Mutex<Option<ActiveWindow<T>>>,
  requested:  AtomicU64,
  upstream:   DeferredSubscription<T>,
  done:       AtomicBool,
}

impl<T: Send + 'static> WindowCountSubscriber<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<Flux<T>>>, size: usize) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      size,
      active: Mutex::new(None),
      requested: AtomicU64::new(0),
      upstream: DeferredSubscription::new(),
      done: AtomicBool::new(false),
    })
  }

  /// Reserves one unit of window demand and creates the sink, or
  /// returns `None` when demand is exhausted. No downstream calls are
  /// made here: the caller holds the window lock, and a downstream
  /// callback may reenter `cancel`, which takes the same lock.
  fn open_window(&self) -> Option<Arc<UnicastSink<T>>> {
    if self.requested.load(Ordering::Acquire) == 0 {
      return None;
    }
    produced(&self.requested, 1);
    Some(UnicastSink::new())
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for WindowCountSubscriber<T> {
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
    let mut opened = None;
    let mut finished = None;
    let mut overflow = false;
    let rejected = {
      let mut active = self.active.lock();
      if active.is_none() {
        match self.open_window() {
          | Some(sink) => {
            opened = Some(sink.clone());
            *active = Some(ActiveWindow { sink, count: 0 });
          },
          | None => overflow = true,
        }
      }
      match active.as_mut() {
        | Some(window) => {
          let rejected = window.sink.push(value).err();
          window.count += 1;
          if window.count == self.size {
            finished = active.take();
          }
          rejected
        },
        | None => Some(value),
      }
    };
    if let Some(sink) = opened {
      self.downstream.on_next(Flux::from_publisher(sink));
    }
    if let Some(window) = finished {
      window.sink.complete();
    }
    if let Some(value) = rejected {
      hooks::on_discard(value, &self.context());
    }
    if overflow {
      self.done.store(true, Ordering::Release);
      self.upstream.cancel();
      self.downstream.on_error(StreamError::Overflow { stage: "window_count" });
    }
  }

  fn on_error(&self, error: StreamError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.context());
      return;
    }
    let active = self.active.lock().take();
    if let Some(window) = active {
      window.sink.fail(error.clone());
    }
    self.downstream.on_error(error);
  }

  fn on_complete(&self) {
    if self.done.swap(true, Ordering::AcqRel) {
      return;
    }
    let active = self.active.lock().take();
    if let Some(window) = active {
      window.sink.complete();
    }
    self.downstream.on_complete();
  }
}

impl<T: Send + 'static> Subscription<Flux<T>> for WindowCountSubscriber<T> {
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
    let active = self.active.lock().take();
    if let Some(window) = active {
      // The truncated window still completes so its subscriber is not
      // left hanging.
      window.sink.complete();
    }
  }
}
