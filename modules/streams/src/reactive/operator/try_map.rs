use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, Ordering};

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, fusion::FusionMode, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
};

#[cfg(test)]
mod tests;

type TryMapper<T, R> = Arc<dyn Fn(&T) -> Result<R, StreamError> + Send + Sync>;

/// Per-value transformation through a fallible mapper.
///
/// A mapper failure cancels upstream, discards the input value, and
/// surfaces the error downstream. Grants `SYNC` fusion only: the
/// failure containment of an async queue is not provided here.
pub(crate) struct TryMapPublisher<T: Send + 'static, R: Send + 'static> {
  source: Arc<dyn Publisher<T>>,
  mapper: TryMapper<T, R>,
}

impl<T: Send + 'static, R: Send + 'static> TryMapPublisher<T, R> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, mapper: TryMapper<T, R>) -> Self {
    Self { source, mapper }
  }
}

impl<T: Send + 'static, R: Send + 'static> Publisher<R> for TryMapPublisher<T, R> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<R>>) {
    self.source.subscribe(TryMapSubscriber::new(subscriber, self.mapper.clone()));
  }
}

struct TryMapSubscriber<T: Send + 'static, R: Send + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<R>>,
  mapper:     TryMapper<T, R>,
  upstream:   DeferredSubscription<T>,
  done:       AtomicBool,
}

impl<T: Send + 'static, R: Send + 'static> TryMapSubscriber<T, R> {
  fn new(downstream: Arc<dyn CoreSubscriber<R>>, mapper: TryMapper<T, R>) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      mapper,
      upstream: DeferredSubscription::new(),
      done: AtomicBool::new(false),
    })
  }

  fn fail_on_value(&self, error: StreamError, value: T) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.context());
      return;
    }
    let context = self.context();
    let error = hooks::on_operator_error(self.upstream.current().as_deref(), error, Some(value), &context);
    self.downstream.on_error(error);
  }
}

impl<T: Send + 'static, R: Send + 'static> CoreSubscriber<T> for TryMapSubscriber<T, R> {
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
    match (self.mapper)(&value) {
      | Ok(mapped) => self.downstream.on_next(mapped),
      | Err(error) => self.fail_on_value(error, value),
    }
  }

  fn try_on_next(&self, value: T) -> bool {
    if self.done.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return true;
    }
    match (self.mapper)(&value) {
      | Ok(mapped) => self.downstream.try_on_next(mapped),
      | Err(error) => {
        self.fail_on_value(error, value);
        true
      },
    }
  }

  fn is_conditional(&self) -> bool {
    self.downstream.is_conditional()
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

impl<T: Send + 'static, R: Send + 'static> Subscription<R> for TryMapSubscriber<T, R> {
  fn request(&self, n: u64) {
    self.upstream.request(n);
  }

  fn cancel(&self) {
    self.upstream.cancel();
  }

  fn request_fusion(&self, mask: FusionMode) -> FusionMode {
    let sync_only = mask.without(FusionMode::ASYNC);
    match self.upstream.current() {
      | Some(upstream) if sync_only.allows_sync() => upstream.request_fusion(FusionMode::SYNC),
      | _ => FusionMode::NONE,
    }
  }

  fn poll(&self) -> Result<Option<R>, StreamError> {
    let Some(upstream) = self.upstream.current() else {
      return Ok(None);
    };
    match upstream.poll()? {
      | Some(value) => match (self.mapper)(&value) {
        | Ok(mapped) => Ok(Some(mapped)),
        | Err(error) => {
          let context = self.context();
          hooks::on_discard(value, &context);
          Err(error)
        },
      },
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
