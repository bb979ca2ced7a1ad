use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, AtomicU64, Ordering};

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, flux::Flux, hooks, publisher::Publisher,
  serialized_subscriber::SerializedSubscriber, stream_error::StreamError, subscriber::CoreSubscriber,
  subscription::Subscription, subscription_arbiter::SubscriptionArbiter,
};

#[cfg(test)]
mod tests;

type SwitchMapper<T, R> = Arc<dyn Fn(T) -> Flux<R> + Send + Sync>;

/// Switches to the sequence derived from each value.
///
/// A generation counter guards the switch: only the newest derived
/// sequence may emit, and installing it through the arbiter cancels
/// the previous one while conserving outstanding demand.
pub(crate) struct SwitchMapPublisher<T: Send + 'static, R: Send + 'static> {
  source: Arc<dyn Publisher<T>>,
  mapper: SwitchMapper<T, R>,
}

impl<T: Send + 'static, R: Send + 'static> SwitchMapPublisher<T, R> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, mapper: SwitchMapper<T, R>) -> Self {
    Self { source, mapper }
  }
}

impl<T: Send + 'static, R: Send + 'static> Publisher<R> for SwitchMapPublisher<T, R> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<R>>) {
    let serialized: Arc<dyn CoreSubscriber<R>> = Arc::new(SerializedSubscriber::new(subscriber));
    let main = SwitchMapMain::new(serialized, self.mapper.clone());
    main.downstream.on_subscribe(main.clone());
    self.source.subscribe(main);
  }
}

struct SwitchMapMain<T: Send + 'static, R: Send + 'static> {
  weak_self:    Weak<Self>,
  downstream:   Arc<dyn CoreSubscriber<R>>,
  mapper:       SwitchMapper<T, R>,
  upstream:     DeferredSubscription<T>,
  arbiter:      SubscriptionArbiter<R>,
  generation:   AtomicU64,
  inner_active: AtomicBool,
  main_done:    AtomicBool,
  terminated:   AtomicBool,
}

impl<T: Send + 'static, R: Send + 'static> SwitchMapMain<T, R> {
  fn new(downstream: Arc<dyn CoreSubscriber<R>>, mapper: SwitchMapper<T, R>) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      mapper,
      upstream: DeferredSubscription::new(),
      arbiter: SubscriptionArbiter::new(),
      generation: AtomicU64::new(0),
      inner_active: AtomicBool::new(false),
      main_done: AtomicBool::new(false),
      terminated: AtomicBool::new(false),
    })
  }

  fn inner_terminal(&self, generation: u64, error: Option<StreamError>) {
    if self.generation.load(Ordering::Acquire) != generation {
      if let Some(error) = error {
        hooks::on_error_dropped(&error, &self.downstream.context());
      }
      return;
    }
    match error {
      | Some(error) => {
        if !self.terminated.swap(true, Ordering::AcqRel) {
          self.upstream.cancel();
          self.downstream.on_error(error);
        }
      },
      | None => {
        self.inner_active.store(false, Ordering::Release);
        if self.main_done.load(Ordering::Acquire) && !self.terminated.swap(true, Ordering::AcqRel) {
          self.downstream.on_complete();
        }
      },
    }
  }
}

impl<T: Send + 'static, R: Send + 'static> CoreSubscriber<T> for SwitchMapMain<T, R> {
  fn context(&self) -> Context {
    self.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    if self.upstream.set(subscription) {
      self.upstream.request(u64::MAX);
    }
  }

  fn on_next(&self, value: T) {
    if self.terminated.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
    self.inner_active.store(true, Ordering::Release);
    let inner = (self.mapper)(value);
    let Some(main) = self.weak_self.upgrade() else {
      return;
    };
    inner.subscribe_with(Arc::new(SwitchMapInner { main, generation }));
  }

  fn on_error(&self, error: StreamError) {
    if self.terminated.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.context());
      return;
    }
    self.arbiter.cancel();
    self.downstream.on_error(error);
  }

  fn on_complete(&self) {
    self.main_done.store(true, Ordering::Release);
    if !self.inner_active.load(Ordering::Acquire) && !self.terminated.swap(true, Ordering::AcqRel) {
      self.downstream.on_complete();
    }
  }
}

impl<T: Send + 'static, R: Send + 'static> Subscription<R> for SwitchMapMain<T, R> {
  fn request(&self, n: u64) {
    self.arbiter.request(n);
  }

  fn cancel(&self) {
    self.upstream.cancel();
    self.arbiter.cancel();
  }
}

struct SwitchMapInner<T: Send + 'static, R: Send + 'static> {
  main:       Arc<SwitchMapMain<T, R>>,
  generation: u64,
}

impl<T: Send + 'static, R: Send + 'static> CoreSubscriber<R> for SwitchMapInner<T, R> {
  fn context(&self) -> Context {
    self.main.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<R>>) {
    if self.main.generation.load(Ordering::Acquire) != self.generation {
      subscription.cancel();
      return;
    }
    self.main.arbiter.set(subscription);
  }

  fn on_next(&self, value: R) {
    if self.main.generation.load(Ordering::Acquire) != self.generation
      || self.main.terminated.load(Ordering::Acquire)
    {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    self.main.arbiter.produced(1);
    self.main.downstream.on_next(value);
  }

  fn on_error(&self, error: StreamError) {
    self.main.inner_terminal(self.generation, Some(error));
  }

  fn on_complete(&self) {
    self.main.inner_terminal(self.generation, None);
  }
}
