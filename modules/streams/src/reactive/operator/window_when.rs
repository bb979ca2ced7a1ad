use alloc::sync::Arc;

use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, flux::Flux, hooks, publisher::Publisher,
  serialized_subscriber::SerializedSubscriber, stream_error::StreamError, subscriber::CoreSubscriber,
  subscription::Subscription, unicast_sink::UnicastSink, support::{add_cap_atomic, produced, validate_demand},
};


/// Splits the sequence into windows delimited by a boundary sequence.
///
/// The first window opens with the first value; each boundary signal
/// completes the open window and opens the next one, consuming one
/// unit of downstream demand per window.
pub(crate) struct WindowWhenPublisher<T: Send + 'static, U: Send + 'static> {
  source:   Arc<dyn Publisher<T>>,
  boundary: Arc<dyn Publisher<U>>,
}

impl<T: Send + 'static, U: Send + 'static> WindowWhenPublisher<T, U> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, boundary: Arc<dyn Publisher<U>>) -> Self {
    Self { source, boundary }
  }
}

impl<T: Send + 'static, U: Send + 'static> Publisher<Flux<T>> for WindowWhenPublisher<T, U> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<Flux<T>>>) {
    let serialized: Arc<dyn CoreSubscriber<Flux<T>>> = Arc::new(SerializedSubscriber::new(subscriber));
    let main = WindowBoundaryMain::new(serialized);
    main.downstream.on_subscribe(main.clone());
    self.boundary.subscribe(Arc::new(WindowBoundaryOther { main: main.clone() }));
    self.source.subscribe(main);
  }
}

struct WindowBoundaryMain<T: Send + 'static, U: Send + 'static> {
  downstream: Arc<dyn CoreSubscriber<Flux<T>>>,
  active:     Mutex<Option<Arc<UnicastSink<T>>>>,
  requested:  AtomicU64,
  upstream:   DeferredSubscription<T>,
  boundary:   DeferredSubscription<U>,
  done:       AtomicBool,
}

impl<T: Send + 'static, U: Send + 'static> WindowBoundaryMain<T, U> {
  fn new(downstream: Arc<dyn CoreSubscriber<Flux<T>>>) -> Arc<Self> {
    Arc::new(Self {
      downstream,
      active: Mutex::new(None),
      requested: AtomicU64::new(0),
      upstream: DeferredSubscription::new(),
      boundary: DeferredSubscription::new(),
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

  fn boundary_next(&self) {
    if self.done.load(Ordering::Acquire) {
      return;
    }
    let mut opened = None;
    let mut overflow = false;
    let closed = {
      let mut active = self.active.lock();
      let closed = active.take();
      if closed.is_some() {
        match self.open_window() {
          | Some(sink) => {
            opened = Some(sink.clone());
            *active = Some(sink);
          },
          | None => overflow = true,
        }
      }
      closed
    };
    if let Some(sink) = closed {
      sink.complete();
    }
    if let Some(sink) = opened {
      self.downstream.on_next(Flux::from_publisher(sink));
    }
    if overflow {
      self.fail(StreamError::Overflow { stage: "window_when" });
    }
  }

  fn fail(&self, error: StreamError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.downstream.context());
      return;
    }
    self.upstream.cancel();
    self.boundary.cancel();
    let active = self.active.lock().take();
    if let Some(sink) = active {
      sink.fail(error.clone());
    }
    self.downstream.on_error(error);
  }

  fn finish(&self) {
    if self.done.swap(true, Ordering::AcqRel) {
      return;
    }
    self.upstream.cancel();
    self.boundary.cancel();
    let active = self.active.lock().take();
    if let Some(sink) = active {
      sink.complete();
    }
    self.downstream.on_complete();
  }
}

impl<T: Send + 'static, U: Send + 'static> CoreSubscriber<T> for WindowBoundaryMain<T, U> {
  fn context(&self) -> Context {
    self.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    if self.upstream.set(subscription) {
      self.upstream.request(u64::MAX);
    }
  }

  fn on_next(&self, value: T) {
    if self.done.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    let mut opened = None;
    let mut overflow = false;
    let rejected = {
      let mut active = self.active.lock();
      if active.is_none() {
        match self.open_window() {
          | Some(sink) => {
            opened = Some(sink.clone());
            *active = Some(sink);
          },
          | None => overflow = true,
        }
      }
      match active.as_ref() {
        // A rejecting sink means the window's subscriber went away;
        // the value is discarded without failing the outer sequence.
        | Some(sink) => sink.push(value).err(),
        | None => Some(value),
      }
    };
    if let Some(sink) = opened {
      self.downstream.on_next(Flux::from_publisher(sink));
    }
    if let Some(value) = rejected {
      hooks::on_discard(value, &self.context());
    }
    if overflow {
      self.fail(StreamError::Overflow { stage: "window_when" });
    }
  }

  fn on_error(&self, error: StreamError) {
    self.fail(error);
  }

  fn on_complete(&self) {
    self.finish();
  }
}

impl<T: Send + 'static, U: Send + 'static> Subscription<Flux<T>> for WindowBoundaryMain<T, U> {
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
    let active = self.active.lock().take();
    if let Some(sink) = active {
      sink.complete();
    }
  }
}

struct WindowBoundaryOther<T: Send + 'static, U: Send + 'static> {
  main: Arc<WindowBoundaryMain<T, U>>,
}

impl<T: Send + 'static, U: Send + 'static> CoreSubscriber<U> for WindowBoundaryOther<T, U> {
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
