use alloc::{boxed::Box, sync::{Arc, Weak}, vec::Vec};

use portable_atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use runnel_utils_core_rs::collections::queue::{QueueFactory, SpscQueue};
use spin::Mutex;

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, flux::Flux, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
  support::{add_cap_atomic, complete_only, error_only, validate_demand},
};


type Selector<T, R> = Arc<dyn Fn(Flux<T>) -> Flux<R> + Send + Sync>;

/// Multicasts the upstream inside a selector scope.
///
/// The selector receives a shared view it may subscribe any number of
/// times while the upstream is subscribed exactly once, behind one
/// prefetch queue. Global demand is the minimum of the inner demands;
/// the upstream is cancelled when the selector-derived sequence
/// terminates or every inner unsubscribes.
pub(crate) struct PublishMulticastPublisher<T, R>
where
  T: Clone + Send + Sync + 'static,
  R: Send + 'static, {
  source:   Arc<dyn Publisher<T>>,
  selector: Selector<T, R>,
  prefetch: usize,
}

impl<T, R> PublishMulticastPublisher<T, R>
where
  T: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, selector: Selector<T, R>, prefetch: usize) -> Self {
    Self { source, selector, prefetch: prefetch.max(1) }
  }
}

impl<T, R> Publisher<R> for PublishMulticastPublisher<T, R>
where
  T: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<R>>) {
    let multicast = MulticastProcessor::new(self.prefetch);
    let derived = (self.selector)(Flux::from_publisher(multicast.clone()));
    derived.subscribe_with(OutputSubscriber::new(subscriber, multicast.clone()));
    self.source.subscribe(multicast);
  }
}

struct MulticastProcessor<T: Clone + Send + Sync + 'static> {
  weak_self:   Weak<Self>,
  queue:       Box<dyn SpscQueue<T>>,
  prefetch:    u64,
  limit:       u64,
  consumed:    AtomicU64,
  upstream:    DeferredSubscription<T>,
  subscribers: Mutex<Vec<Arc<MulticastInner<T>>>>,
  wip:         AtomicUsize,
  done:        AtomicBool,
  error:       Mutex<Option<StreamError>>,
  cancelled:   AtomicBool,
}

impl<T: Clone + Send + Sync + 'static> MulticastProcessor<T> {
  fn new(prefetch: usize) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self:   weak_self.clone(),
      queue:       QueueFactory::for_capacity(prefetch),
      prefetch:    prefetch as u64,
      limit:       (prefetch - (prefetch >> 2)).max(1) as u64,
      consumed:    AtomicU64::new(0),
      upstream:    DeferredSubscription::new(),
      subscribers: Mutex::new(Vec::new()),
      wip:         AtomicUsize::new(0),
      done:        AtomicBool::new(false),
      error:       Mutex::new(None),
      cancelled:   AtomicBool::new(false),
    })
  }

  fn shared_context(&self) -> Context {
    self.subscribers.lock().first().map_or_else(Context::empty, |inner| inner.downstream.context())
  }

  /// The derived sequence went away; the upstream has no consumer left.
  fn shutdown(&self) {
    if self.cancelled.swap(true, Ordering::AcqRel) {
      return;
    }
    self.upstream.cancel();
    self.drain();
  }

  fn remove_inner(&self, inner: *const MulticastInner<T>) {
    let mut subscribers = self.subscribers.lock();
    subscribers.retain(|candidate| !core::ptr::eq(Arc::as_ptr(candidate), inner));
    let empty = subscribers.is_empty();
    drop(subscribers);
    if empty {
      self.shutdown();
    } else {
      self.drain();
    }
  }

  fn drain(&self) {
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    let mut missed = 1;
    loop {
      if self.cancelled.load(Ordering::Acquire) {
        let context = self.shared_context();
        self.queue.clear_with(&mut |value| hooks::on_discard(value, &context));
        self.subscribers.lock().clear();
      } else {
        self.drain_values();
      }
      missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
      if missed == 0 {
        return;
      }
    }
  }

  fn drain_values(&self) {
    loop {
      let subscribers = self.subscribers.lock().clone();
      if subscribers.is_empty() {
        break;
      }
      let available = subscribers
        .iter()
        .map(|inner| inner.pending_demand())
        .min()
        .unwrap_or(0);
      let mut emitted = 0_u64;
      while emitted < available {
        let Some(value) = self.queue.poll() else {
          break;
        };
        for inner in &subscribers {
          inner.deliver(value.clone());
        }
        emitted += 1;
      }
      if emitted > 0 {
        let consumed = self.consumed.fetch_add(emitted, Ordering::AcqRel) + emitted;
        if consumed >= self.limit && !self.done.load(Ordering::Acquire) {
          self.consumed.store(0, Ordering::Relaxed);
          self.upstream.request(consumed);
        }
      }
      if emitted == 0 {
        break;
      }
    }
    if self.done.load(Ordering::Acquire) && self.queue.is_empty() {
      let subscribers = core::mem::take(&mut *self.subscribers.lock());
      if !subscribers.is_empty() {
        let error = self.error.lock().clone();
        for inner in subscribers {
          inner.terminate(error.clone());
        }
      }
    }
  }
}

impl<T: Clone + Send + Sync + 'static> CoreSubscriber<T> for MulticastProcessor<T> {
  fn context(&self) -> Context {
    self.shared_context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    if self.upstream.set(subscription) {
      if self.cancelled.load(Ordering::Acquire) {
        self.upstream.cancel();
        return;
      }
      self.upstream.request(self.prefetch);
    }
  }

  fn on_next(&self, value: T) {
    if self.done.load(Ordering::Acquire) || self.cancelled.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.shared_context());
      return;
    }
    if let Err(value) = self.queue.offer(value) {
      hooks::on_discard(value, &self.shared_context());
      *self.error.lock() = Some(StreamError::Overflow { stage: "publish" });
      self.done.store(true, Ordering::Release);
      self.upstream.cancel();
    }
    self.drain();
  }

  fn on_error(&self, error: StreamError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.shared_context());
      return;
    }
    *self.error.lock() = Some(error);
    self.drain();
  }

  fn on_complete(&self) {
    if !self.done.swap(true, Ordering::AcqRel) {
      self.drain();
    }
  }
}

/// The shared view handed to the selector.
impl<T: Clone + Send + Sync + 'static> Publisher<T> for MulticastProcessor<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    if self.cancelled.load(Ordering::Acquire) {
      error_only(&subscriber, StreamError::Cancelled);
      return;
    }
    if self.done.load(Ordering::Acquire) && self.queue.is_empty() {
      match self.error.lock().clone() {
        | Some(error) => error_only(&subscriber, error),
        | None => complete_only(&subscriber),
      }
      return;
    }
    let Some(processor) = self.weak_self.upgrade() else {
      return;
    };
    let inner = Arc::new(MulticastInner {
      processor,
      downstream: subscriber.clone(),
      requested:  AtomicU64::new(0),
      emitted:    AtomicU64::new(0),
      gone:       AtomicBool::new(false),
    });
    self.subscribers.lock().push(inner.clone());
    subscriber.on_subscribe(inner);
    self.drain();
  }
}

struct MulticastInner<T: Clone + Send + Sync + 'static> {
  processor:  Arc<MulticastProcessor<T>>,
  downstream: Arc<dyn CoreSubscriber<T>>,
  requested:  AtomicU64,
  emitted:    AtomicU64,
  gone:       AtomicBool,
}

impl<T: Clone + Send + Sync + 'static> MulticastInner<T> {
  fn pending_demand(&self) -> u64 {
    let requested = self.requested.load(Ordering::Acquire);
    if requested == u64::MAX {
      return u64::MAX;
    }
    requested.saturating_sub(self.emitted.load(Ordering::Acquire))
  }

  fn deliver(&self, value: T) {
    if self.gone.load(Ordering::Acquire) {
      hooks::on_discard(value, &self.downstream.context());
      return;
    }
    self.emitted.fetch_add(1, Ordering::AcqRel);
    self.downstream.on_next(value);
  }

  fn terminate(&self, error: Option<StreamError>) {
    if self.gone.swap(true, Ordering::AcqRel) {
      return;
    }
    match error {
      | Some(error) => self.downstream.on_error(error),
      | None => self.downstream.on_complete(),
    }
  }
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> for MulticastInner<T> {
  fn request(&self, n: u64) {
    if let Err(error) = validate_demand(n) {
      self.terminate(Some(error));
      return;
    }
    add_cap_atomic(&self.requested, n);
    self.processor.drain();
  }

  fn cancel(&self) {
    if self.gone.swap(true, Ordering::AcqRel) {
      return;
    }
    self.processor.remove_inner(self);
  }
}

struct OutputSubscriber<T, R>
where
  T: Clone + Send + Sync + 'static,
  R: Send + 'static, {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<R>>,
  multicast:  Arc<MulticastProcessor<T>>,
  upstream:   DeferredSubscription<R>,
  done:       AtomicBool,
}

impl<T, R> OutputSubscriber<T, R>
where
  T: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
  fn new(downstream: Arc<dyn CoreSubscriber<R>>, multicast: Arc<MulticastProcessor<T>>) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      multicast,
      upstream: DeferredSubscription::new(),
      done: AtomicBool::new(false),
    })
  }
}

impl<T, R> CoreSubscriber<R> for OutputSubscriber<T, R>
where
  T: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
  fn context(&self) -> Context {
    self.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<R>>) {
    if !self.upstream.set(subscription) {
      return;
    }
    if let Some(this) = self.weak_self.upgrade() {
      self.downstream.on_subscribe(this);
    }
  }

  fn on_next(&self, value: R) {
    if self.done.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    self.downstream.on_next(value);
  }

  fn on_error(&self, error: StreamError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.context());
      return;
    }
    self.downstream.on_error(error);
    self.multicast.shutdown();
  }

  fn on_complete(&self) {
    if !self.done.swap(true, Ordering::AcqRel) {
      self.downstream.on_complete();
      self.multicast.shutdown();
    }
  }
}

impl<T, R> Subscription<R> for OutputSubscriber<T, R>
where
  T: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
  fn request(&self, n: u64) {
    self.upstream.request(n);
  }

  fn cancel(&self) {
    self.upstream.cancel();
    self.multicast.shutdown();
  }
}
