use alloc::sync::Arc;

use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, hooks, publisher::Publisher,
  serialized_subscriber::SerializedSubscriber, stream_error::StreamError, subscriber::CoreSubscriber,
  subscription::Subscription, support::{add_cap_atomic, produced, validate_demand},
};

#[cfg(test)]
mod tests;

/// Emits the latest main value on each sampler signal.
///
/// Both upstreams run unbounded; downstream demand gates only the
/// sampled emissions. A sampler tick with zero downstream demand is an
/// overflow error. The sampler side may race the main side, so the
/// downstream is wrapped in a serializer.
pub(crate) struct SamplePublisher<T: Send + 'static, U: Send + 'static> {
  source:  Arc<dyn Publisher<T>>,
  sampler: Arc<dyn Publisher<U>>,
}

impl<T: Send + 'static, U: Send + 'static> SamplePublisher<T, U> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, sampler: Arc<dyn Publisher<U>>) -> Self {
    Self { source, sampler }
  }
}

impl<T: Send + 'static, U: Send + 'static> Publisher<T> for SamplePublisher<T, U> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    let serialized: Arc<dyn CoreSubscriber<T>> = Arc::new(SerializedSubscriber::new(subscriber));
    let main = SampleMain::new(serialized);
    main.downstream.on_subscribe(main.clone());
    self.sampler.subscribe(Arc::new(SampleOther { main: main.clone() }));
    self.source.subscribe(main);
  }
}

struct SampleMain<T: Send + 'static, U: Send + 'static> {
  downstream: Arc<dyn CoreSubscriber<T>>,
  latest:     Mutex<Option<T>>,
  requested:  AtomicU64,
  upstream:   DeferredSubscription<T>,
  sampler:    DeferredSubscription<U>,
  done:       AtomicBool,
}

impl<T: Send + 'static, U: Send + 'static> SampleMain<T, U> {
  fn new(downstream: Arc<dyn CoreSubscriber<T>>) -> Arc<Self> {
    Arc::new(Self {
      downstream,
      latest: Mutex::new(None),
      requested: AtomicU64::new(0),
      upstream: DeferredSubscription::new(),
      sampler: DeferredSubscription::new(),
      done: AtomicBool::new(false),
    })
  }

  fn terminate(&self, error: Option<StreamError>) {
    if self.done.swap(true, Ordering::AcqRel) {
      if let Some(error) = error {
        hooks::on_error_dropped(&error, &self.downstream.context());
      }
      return;
    }
    self.upstream.cancel();
    self.sampler.cancel();
    let latest = self.latest.lock().take();
    if let Some(value) = latest {
      hooks::on_discard(value, &self.downstream.context());
    }
    match error {
      | Some(error) => self.downstream.on_error(error),
      | None => self.downstream.on_complete(),
    }
  }

  fn tick(&self) {
    if self.done.load(Ordering::Acquire) {
      return;
    }
    let value = self.latest.lock().take();
    let Some(value) = value else {
      return;
    };
    if self.requested.load(Ordering::Acquire) > 0 {
      produced(&self.requested, 1);
      self.downstream.on_next(value);
    } else {
      hooks::on_discard(value, &self.downstream.context());
      self.terminate(Some(StreamError::Overflow { stage: "sample" }));
    }
  }
}

impl<T: Send + 'static, U: Send + 'static> CoreSubscriber<T> for SampleMain<T, U> {
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
    let replaced = self.latest.lock().replace(value);
    if let Some(old) = replaced {
      hooks::on_discard(old, &self.context());
    }
  }

  fn on_error(&self, error: StreamError) {
    self.terminate(Some(error));
  }

  fn on_complete(&self) {
    self.terminate(None);
  }
}

impl<T: Send + 'static, U: Send + 'static> Subscription<T> for SampleMain<T, U> {
  fn request(&self, n: u64) {
    if let Err(error) = validate_demand(n) {
      self.terminate(Some(error));
      return;
    }
    add_cap_atomic(&self.requested, n);
  }

  fn cancel(&self) {
    if self.done.swap(true, Ordering::AcqRel) {
      return;
    }
    self.upstream.cancel();
    self.sampler.cancel();
    let latest = self.latest.lock().take();
    if let Some(value) = latest {
      hooks::on_discard(value, &self.downstream.context());
    }
  }
}

struct SampleOther<T: Send + 'static, U: Send + 'static> {
  main: Arc<SampleMain<T, U>>,
}

impl<T: Send + 'static, U: Send + 'static> CoreSubscriber<U> for SampleOther<T, U> {
  fn context(&self) -> Context {
    self.main.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<U>>) {
    if self.main.sampler.set(subscription) {
      self.main.sampler.request(u64::MAX);
    }
  }

  fn on_next(&self, _tick: U) {
    self.main.tick();
  }

  fn on_error(&self, error: StreamError) {
    self.main.terminate(Some(error));
  }

  fn on_complete(&self) {
    self.main.terminate(None);
  }
}
