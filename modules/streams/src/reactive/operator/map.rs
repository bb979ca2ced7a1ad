use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, Ordering};

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, fusion::FusionMode, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
};


/// Per-value transformation.
///
/// Fuses in both directions: the mapper is infallible, so `SYNC` polls
/// map in place and `ASYNC` wakes pass straight through.
pub(crate) struct MapPublisher<T: Send + 'static, R: Send + 'static> {
  source: Arc<dyn Publisher<T>>,
  mapper: Arc<dyn Fn(T) -> R + Send + Sync>,
}

impl<T: Send + 'static, R: Send + 'static> MapPublisher<T, R> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, mapper: Arc<dyn Fn(T) -> R + Send + Sync>) -> Self {
    Self { source, mapper }
  }
}

impl<T: Send + 'static, R: Send + 'static> Publisher<R> for MapPublisher<T, R> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<R>>) {
    self.source.subscribe(MapSubscriber::new(subscriber, self.mapper.clone()));
  }
}

struct MapSubscriber<T: Send + 'static, R: Send + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<R>>,
  mapper:     Arc<dyn Fn(T) -> R + Send + Sync>,
  upstream:   DeferredSubscription<T>,
  done:       AtomicBool,
}

impl<T: Send + 'static, R: Send + 'static> MapSubscriber<T, R> {
  fn new(downstream: Arc<dyn CoreSubscriber<R>>, mapper: Arc<dyn Fn(T) -> R + Send + Sync>) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      mapper,
      upstream: DeferredSubscription::new(),
      done: AtomicBool::new(false),
    })
  }
}

impl<T: Send + 'static, R: Send + 'static> CoreSubscriber<T> for MapSubscriber<T, R> {
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
    self.downstream.on_next((self.mapper)(value));
  }

  fn try_on_next(&self, value: T) -> bool {
    if self.done.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return true;
    }
    self.downstream.try_on_next((self.mapper)(value))
  }

  fn is_conditional(&self) -> bool {
    self.downstream.is_conditional()
  }

  fn on_poll_ready(&self) {
    self.downstream.on_poll_ready();
  }

  fn on_error(&self, error: StreamError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.context());
      return;
    }
    self.downstream.on_error(error);
  }

  fn on_complete(&self) {
    if !self.done.swap(true, Ordering::AcqRel) {
      self.downstream.on_complete();
    }
  }
}

impl<T: Send + 'static, R: Send + 'static> Subscription<R> for MapSubscriber<T, R> {
  fn request(&self, n: u64) {
    self.upstream.request(n);
  }

  fn cancel(&self) {
    self.upstream.cancel();
  }

  fn request_fusion(&self, mask: FusionMode) -> FusionMode {
    match self.upstream.current() {
      | Some(upstream) => upstream.request_fusion(mask),
      | None => FusionMode::NONE,
    }
  }

  fn poll(&self) -> Result<Option<R>, StreamError> {
    match self.upstream.current() {
      | Some(upstream) => Ok(upstream.poll()?.map(|value| (self.mapper)(value))),
      | None => Ok(None),
    }
  }

  fn is_poll_empty(&self) -> bool {
    self.upstream.current().map_or(true, |upstream| upstream.is_poll_empty())
  }

  fn poll_len(&self) -> usize {
    self.upstream.current().map_or(0, |upstream| upstream.poll_len())
  }

  fn clear_poll(&self) {
    if let Some(upstream) = self.upstream.current() {
      upstream.clear_poll();
    }
  }
}
