use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, Ordering};

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
};

#[cfg(test)]
mod tests;

type FirstFn = Arc<dyn Fn() + Send + Sync>;
type SubscribeFn = Arc<dyn Fn() + Send + Sync>;
type NextFn<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&StreamError) + Send + Sync>;
type CompleteFn = Arc<dyn Fn() + Send + Sync>;
type RequestFn = Arc<dyn Fn(u64) + Send + Sync>;
type CancelFn = Arc<dyn Fn() + Send + Sync>;

/// Side-effect callbacks observed around matching signals.
///
/// Callbacks are infallible; a panicking callback is the fatal class
/// and unwinds through the operator.
pub(crate) struct PeekCallbacks<T> {
  first:         Option<FirstFn>,
  subscribe:     Option<SubscribeFn>,
  next:          Option<NextFn<T>>,
  error:         Option<ErrorFn>,
  complete:      Option<CompleteFn>,
  request:       Option<RequestFn>,
  cancel_signal: Option<CancelFn>,
}

impl<T> PeekCallbacks<T> {
  pub(crate) fn new() -> Self {
    Self {
      first:         None,
      subscribe:     None,
      next:          None,
      error:         None,
      complete:      None,
      request:       None,
      cancel_signal: None,
    }
  }

  pub(crate) fn on_first(mut self, callback: FirstFn) -> Self {
    self.first = Some(callback);
    self
  }

  pub(crate) fn on_subscribe(mut self, callback: SubscribeFn) -> Self {
    self.subscribe = Some(callback);
    self
  }

  pub(crate) fn on_next(mut self, callback: NextFn<T>) -> Self {
    self.next = Some(callback);
    self
  }

  pub(crate) fn on_error(mut self, callback: ErrorFn) -> Self {
    self.error = Some(callback);
    self
  }

  pub(crate) fn on_complete(mut self, callback: CompleteFn) -> Self {
    self.complete = Some(callback);
    self
  }

  pub(crate) fn on_request(mut self, callback: RequestFn) -> Self {
    self.request = Some(callback);
    self
  }

  pub(crate) fn on_cancel(mut self, callback: CancelFn) -> Self {
    self.cancel_signal = Some(callback);
    self
  }
}

impl<T> Clone for PeekCallbacks<T> {
  fn clone(&self) -> Self {
    Self {
      first:         self.first.clone(),
      subscribe:     self.subscribe.clone(),
      next:          self.next.clone(),
      error:         self.error.clone(),
      complete:      self.complete.clone(),
      request:       self.request.clone(),
      cancel_signal: self.cancel_signal.clone(),
    }
  }
}

/// Signal observation operator.
pub(crate) struct PeekPublisher<T: Send + 'static> {
  source:    Arc<dyn Publisher<T>>,
  callbacks: PeekCallbacks<T>,
}

impl<T: Send + 'static> PeekPublisher<T> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, callbacks: PeekCallbacks<T>) -> Self {
    Self { source, callbacks }
  }
}

impl<T: Send + 'static> Publisher<T> for PeekPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    if let Some(first) = &self.callbacks.first {
      first();
    }
    self.source.subscribe(PeekSubscriber::new(subscriber, self.callbacks.clone()));
  }
}

struct PeekSubscriber<T: Send + 'static> {
  weak_self:  Weak<Self>,
  downstream: Arc<dyn CoreSubscriber<T>>,
  callbacks:  PeekCallbacks<T>,
  upstream:   DeferredSubscription<T>,
  done:       AtomicBool,
}

impl<T: Send + 'static> PeekSubscriber<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<T>>, callbacks: PeekCallbacks<T>) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      callbacks,
      upstream: DeferredSubscription::new(),
      done: AtomicBool::new(false),
    })
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for PeekSubscriber<T> {
  fn context(&self) -> Context {
    self.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    if !self.upstream.set(subscription) {
      return;
    }
    if let Some(callback) = &self.callbacks.subscribe {
      callback();
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
    if let Some(callback) = &self.callbacks.next {
      callback(&value);
    }
    self.downstream.on_next(value);
  }

  fn on_error(&self, error: StreamError) {
    if self.done.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.context());
      return;
    }
    if let Some(callback) = &self.callbacks.error {
      callback(&error);
    }
    self.downstream.on_error(error);
  }

  fn on_complete(&self) {
    if self.done.swap(true, Ordering::AcqRel) {
      return;
    }
    if let Some(callback) = &self.callbacks.complete {
      callback();
    }
    self.downstream.on_complete();
  }
}

impl<T: Send + 'static> Subscription<T> for PeekSubscriber<T> {
  fn request(&self, n: u64) {
    if let Some(callback) = &self.callbacks.request {
      callback(n);
    }
    self.upstream.request(n);
  }

  fn cancel(&self) {
    if !self.upstream.is_cancelled() {
      if let Some(callback) = &self.callbacks.cancel_signal {
        callback();
      }
    }
    self.upstream.cancel();
  }
}
