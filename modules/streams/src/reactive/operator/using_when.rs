use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicBool, Ordering};
use spin::Mutex;

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, flux::Flux, hooks, mono::Mono,
  publisher::Publisher, stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
};


type ClosureFn<R, T> = Arc<dyn Fn(&Arc<R>) -> Flux<T> + Send + Sync>;
type CompleteFn<R> = Arc<dyn Fn(&Arc<R>) -> Mono<()> + Send + Sync>;
type ErrorFn<R> = Arc<dyn Fn(&Arc<R>, &StreamError) -> Mono<()> + Send + Sync>;
type CancelFn<R> = Arc<dyn Fn(&Arc<R>) -> Mono<()> + Send + Sync>;

/// Derives the sequence from an asynchronously acquired resource and
/// runs the matching asynchronous cleanup after the terminal.
///
/// The main terminal is withheld until the cleanup sequence
/// terminates; a failing cleanup is combined with the main error as a
/// suppressed failure. Downstream cancellation triggers the cancel
/// cleanup on a fire-and-forget basis.
pub(crate) struct UsingWhenPublisher<R: Send + Sync + 'static, T: Send + 'static> {
  resource:    Arc<dyn Publisher<R>>,
  closure:     ClosureFn<R, T>,
  on_complete: CompleteFn<R>,
  on_error:    ErrorFn<R>,
  on_cancel:   CancelFn<R>,
}

impl<R: Send + Sync + 'static, T: Send + 'static> UsingWhenPublisher<R, T> {
  pub(crate) fn new(
    resource: Arc<dyn Publisher<R>>,
    closure: ClosureFn<R, T>,
    on_complete: CompleteFn<R>,
    on_error: ErrorFn<R>,
    on_cancel: CancelFn<R>,
  ) -> Self {
    Self { resource, closure, on_complete, on_error, on_cancel }
  }
}

impl<R: Send + Sync + 'static, T: Send + 'static> Publisher<T> for UsingWhenPublisher<R, T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    let main = UsingWhenMain::new(
      subscriber,
      self.closure.clone(),
      self.on_complete.clone(),
      self.on_error.clone(),
      self.on_cancel.clone(),
    );
    main.downstream.on_subscribe(main.clone());
    self.resource.subscribe(Arc::new(ResourceSubscriber { main: main.clone() }));
  }
}

struct UsingWhenMain<R: Send + Sync + 'static, T: Send + 'static> {
  weak_self:   Weak<Self>,
  downstream:  Arc<dyn CoreSubscriber<T>>,
  closure:     ClosureFn<R, T>,
  on_complete: CompleteFn<R>,
  on_error:    ErrorFn<R>,
  on_cancel:   CancelFn<R>,
  resource:    Mutex<Option<Arc<R>>>,
  resource_up: DeferredSubscription<R>,
  upstream:    DeferredSubscription<T>,
  cancelled:   AtomicBool,
  done:        AtomicBool,
}

impl<R: Send + Sync + 'static, T: Send + 'static> UsingWhenMain<R, T> {
  fn new(
    downstream: Arc<dyn CoreSubscriber<T>>,
    closure: ClosureFn<R, T>,
    on_complete: CompleteFn<R>,
    on_error: ErrorFn<R>,
    on_cancel: CancelFn<R>,
  ) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      downstream,
      closure,
      on_complete,
      on_error,
      on_cancel,
      resource: Mutex::new(None),
      resource_up: DeferredSubscription::new(),
      upstream: DeferredSubscription::new(),
      cancelled: AtomicBool::new(false),
      done: AtomicBool::new(false),
    })
  }

  fn resource_arrived(&self, resource: R) {
    if self.cancelled.load(Ordering::Acquire) {
      // Acquired after downstream already left: release it right away.
      let shared = Arc::new(resource);
      (self.on_cancel)(&shared).subscribe_with(Arc::new(CleanupSubscriber::<R, T>::fire_and_forget(
        self.downstream.context(),
      )));
      return;
    }
    let shared = Arc::new(resource);
    *self.resource.lock() = Some(shared.clone());
    let main = (self.closure)(&shared);
    let Some(this) = self.weak_self.upgrade() else {
      return;
    };
    main.subscribe_with(Arc::new(MainSubscriber { main: this }));
  }

  fn main_terminal(&self, error: Option<StreamError>) {
    if self.done.swap(true, Ordering::AcqRel) {
      if let Some(error) = error {
        hooks::on_error_dropped(&error, &self.downstream.context());
      }
      return;
    }
    let resource = self.resource.lock().clone();
    let Some(resource) = resource else {
      // No resource can only mean no main sequence either.
      match error {
        | Some(error) => self.downstream.on_error(error),
        | None => self.downstream.on_complete(),
      }
      return;
    };
    let cleanup = match &error {
      | Some(main_error) => (self.on_error)(&resource, main_error),
      | None => (self.on_complete)(&resource),
    };
    let Some(this) = self.weak_self.upgrade() else {
      return;
    };
    cleanup.subscribe_with(Arc::new(CleanupSubscriber { main: Some(this), terminal: Mutex::new(Some(error)), context: self.downstream.context() }));
  }

  fn cleanup_finished(&self, terminal: Option<StreamError>, cleanup_failure: Option<StreamError>) {
    match (terminal, cleanup_failure) {
      | (Some(main_error), Some(cleanup_error)) => {
        self.downstream.on_error(main_error.with_suppressed(cleanup_error));
      },
      | (Some(main_error), None) => self.downstream.on_error(main_error),
      | (None, Some(cleanup_error)) => self.downstream.on_error(cleanup_error),
      | (None, None) => self.downstream.on_complete(),
    }
  }

  fn cancelled_downstream(&self) {
    if self.cancelled.swap(true, Ordering::AcqRel) {
      return;
    }
    self.resource_up.cancel();
    self.upstream.cancel();
    if self.done.load(Ordering::Acquire) {
      return;
    }
    let resource = self.resource.lock().clone();
    if let Some(resource) = resource {
      (self.on_cancel)(&resource).subscribe_with(Arc::new(CleanupSubscriber::<R, T>::fire_and_forget(
        self.downstream.context(),
      )));
    }
  }
}

impl<R: Send + Sync + 'static, T: Send + 'static> Subscription<T> for UsingWhenMain<R, T> {
  fn request(&self, n: u64) {
    self.upstream.request(n);
  }

  fn cancel(&self) {
    self.cancelled_downstream();
  }
}

struct ResourceSubscriber<R: Send + Sync + 'static, T: Send + 'static> {
  main: Arc<UsingWhenMain<R, T>>,
}

impl<R: Send + Sync + 'static, T: Send + 'static> CoreSubscriber<R> for ResourceSubscriber<R, T> {
  fn context(&self) -> Context {
    self.main.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<R>>) {
    if self.main.resource_up.set(subscription) {
      self.main.resource_up.request(u64::MAX);
    }
  }

  fn on_next(&self, resource: R) {
    // Only the first resource counts; a second one would be a
    // misbehaving resource publisher.
    self.main.resource_up.cancel();
    self.main.resource_arrived(resource);
  }

  fn on_error(&self, error: StreamError) {
    self.main.main_terminal(Some(error));
  }

  fn on_complete(&self) {
    // Empty resource sequence: nothing was acquired.
    if self.main.resource.lock().is_none() {
      self.main.main_terminal(None);
    }
  }
}

struct MainSubscriber<R: Send + Sync + 'static, T: Send + 'static> {
  main: Arc<UsingWhenMain<R, T>>,
}

impl<R: Send + Sync + 'static, T: Send + 'static> CoreSubscriber<T> for MainSubscriber<R, T> {
  fn context(&self) -> Context {
    self.main.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    self.main.upstream.set(subscription);
  }

  fn on_next(&self, value: T) {
    if self.main.done.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    self.main.downstream.on_next(value);
  }

  fn on_error(&self, error: StreamError) {
    self.main.main_terminal(Some(error));
  }

  fn on_complete(&self) {
    self.main.main_terminal(None);
  }
}

/// Watches one cleanup sequence and releases the withheld terminal.
struct CleanupSubscriber<R: Send + Sync + 'static, T: Send + 'static> {
  main:     Option<Arc<UsingWhenMain<R, T>>>,
  terminal: Mutex<Option<Option<StreamError>>>,
  context:  Context,
}

impl<R: Send + Sync + 'static, T: Send + 'static> CleanupSubscriber<R, T> {
  fn fire_and_forget(context: Context) -> Self {
    Self { main: None, terminal: Mutex::new(None), context }
  }
}

impl<R: Send + Sync + 'static, T: Send + 'static> CoreSubscriber<()> for CleanupSubscriber<R, T> {
  fn context(&self) -> Context {
    self.context.clone()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<()>>) {
    subscription.request(u64::MAX);
  }

  fn on_next(&self, _value: ()) {}

  fn on_error(&self, error: StreamError) {
    match &self.main {
      | Some(main) => {
        let terminal = self.terminal.lock().take().flatten();
        main.cleanup_finished(terminal, Some(error));
      },
      | None => hooks::on_error_dropped(&error, &self.context),
    }
  }

  fn on_complete(&self) {
    if let Some(main) = &self.main {
      let terminal = self.terminal.lock().take().flatten();
      main.cleanup_finished(terminal, None);
    }
  }
}
