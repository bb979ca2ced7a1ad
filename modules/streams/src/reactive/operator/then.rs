use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, Ordering};

use crate::reactive::{
  context::Context, hooks, publisher::Publisher, stream_error::StreamError, subscriber::CoreSubscriber,
  subscription::Subscription, subscription_arbiter::SubscriptionArbiter,
};

#[cfg(test)]
mod tests;

/// Drains the first sequence for its terminal, then continues with the
/// next one.
pub(crate) struct ThenPublisher<T: Send + 'static, R: Send + 'static> {
  first: Arc<dyn Publisher<T>>,
  next:  Arc<dyn Publisher<R>>,
}

impl<T: Send + 'static, R: Send + 'static> ThenPublisher<T, R> {
  pub(crate) fn new(first: Arc<dyn Publisher<T>>, next: Arc<dyn Publisher<R>>) -> Self {
    Self { first, next }
  }
}

impl<T: Send + 'static, R: Send + 'static> Publisher<R> for ThenPublisher<T, R> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<R>>) {
    let main = ThenMain::new(subscriber, self.next.clone());
    main.downstream.on_subscribe(main.clone());
    self.first.subscribe(Arc::new(ThenFirstSubscriber { main: main.clone() }));
  }
}

struct ThenMain<T: Send + 'static, R: Send + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<R>>,
  next:       Arc<dyn Publisher<R>>,
  arbiter:    SubscriptionArbiter<R>,
  first_done: AtomicBool,
  done:       AtomicBool,
  _marker:    core::marker::PhantomData<fn(T)>,
}

impl<T: Send + 'static, R: Send + 'static> ThenMain<T, R> {
  fn new(downstream: Arc<dyn CoreSubscriber<R>>, next: Arc<dyn Publisher<R>>) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      next,
      arbiter: SubscriptionArbiter::new(),
      first_done: AtomicBool::new(false),
      done: AtomicBool::new(false),
      _marker: core::marker::PhantomData,
    })
  }

  fn first_finished(&self) {
    if self.first_done.swap(true, Ordering::AcqRel) {
      return;
    }
    if let Some(this) = self.weak_self.upgrade() {
      self.next.subscribe(this);
    }
  }

  fn fail(&self, error: StreamError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.downstream.context());
      return;
    }
    self.downstream.on_error(error);
  }
}

impl<T: Send + 'static, R: Send + 'static> CoreSubscriber<R> for ThenMain<T, R> {
  fn context(&self) -> Context {
    self.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<R>>) {
    self.arbiter.set(subscription);
  }

  fn on_next(&self, value: R) {
    if self.done.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    self.arbiter.produced(1);
    self.downstream.on_next(value);
  }

  fn on_error(&self, error: StreamError) {
    self.fail(error);
  }

  fn on_complete(&self) {
    if !self.done.swap(true, Ordering::AcqRel) {
      self.downstream.on_complete();
    }
  }
}

impl<T: Send + 'static, R: Send + 'static> Subscription<R> for ThenMain<T, R> {
  fn request(&self, n: u64) {
    self.arbiter.request(n);
  }

  fn cancel(&self) {
    self.arbiter.cancel();
  }
}

struct ThenFirstSubscriber<T: Send + 'static, R: Send + 'static> {
  main: Arc<ThenMain<T, R>>,
}

impl<T: Send + 'static, R: Send + 'static> CoreSubscriber<T> for ThenFirstSubscriber<T, R> {
  fn context(&self) -> Context {
    self.main.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    // The first stage only terminates; its values are drained freely.
    let adapter: Arc<dyn Subscription<R>> = Arc::new(IgnoreValuesSubscription { inner: subscription.clone() });
    if self.main.arbiter.set(adapter) {
      subscription.request(u64::MAX);
    }
  }

  fn on_next(&self, value: T) {
    hooks::on_discard(value, &self.context());
  }

  fn on_error(&self, error: StreamError) {
    self.main.fail(error);
  }

  fn on_complete(&self) {
    self.main.first_finished();
  }
}

/// Adapts the first stage's subscription to the output element type;
/// only cancellation crosses the boundary.
struct IgnoreValuesSubscription<T: Send + 'static> {
  inner: Arc<dyn Subscription<T>>,
}

impl<T: Send + 'static, R> Subscription<R> for IgnoreValuesSubscription<T> {
  fn request(&self, _n: u64) {}

  fn cancel(&self) {
    self.inner.cancel();
  }
}
