use alloc::sync::{Arc, Weak};

use portable_atomic::{AtomicU32, Ordering};
use spin::Mutex;

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, flux::Flux, hooks, publisher::Publisher,
  signal::Signal, stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
  support::{error_only, validate_demand},
};

#[cfg(test)]
mod tests;

// One bit per independent fact; transitions are monotonic ORs whose
// pre-state decides the side effects to run.
const FIRST_RECEIVED: u32 = 1;
const INBOUND_SUBSCRIBED_ONCE: u32 = 1 << 1;
const INBOUND_SUBSCRIBER_SET: u32 = 1 << 2;
const INBOUND_REQUESTED_ONCE: u32 = 1 << 3;
const INBOUND_CANCELLED: u32 = 1 << 4;
const INBOUND_TERMINATED: u32 = 1 << 5;
const OUTBOUND_SUBSCRIBED: u32 = 1 << 6;
const OUTBOUND_CANCELLED: u32 = 1 << 7;
const OUTBOUND_TERMINATED: u32 = 1 << 8;

const fn has(state: u32, flag: u32) -> bool {
  state & flag == flag
}

type Transform<T, R> = Arc<dyn Fn(Signal<T>, Flux<T>) -> Flux<R> + Send + Sync>;

/// Hands the first signal and the remaining sequence to a transform
/// choosing the outbound sequence.
///
/// One state machine plays both roles: subscriber to the inbound
/// upstream and publisher of the re-exposed remainder, which the
/// transform may subscribe at most once. The first value travels only
/// inside the transform's signal; the remainder carries everything
/// after it. Terminals arriving while no inner subscriber exists are
/// stored and replayed on subscribe.
pub(crate) struct SwitchOnFirstPublisher<T: Send + 'static, R: Send + 'static> {
  source:                    Arc<dyn Publisher<T>>,
  transform:                 Transform<T, R>,
  cancel_source_on_complete: bool,
}

impl<T: Send + 'static, R: Send + 'static> SwitchOnFirstPublisher<T, R> {
  pub(crate) fn new(source: Arc<dyn Publisher<T>>, transform: Transform<T, R>, cancel_source_on_complete: bool) -> Self {
    Self { source, transform, cancel_source_on_complete }
  }
}

impl<T: Send + 'static, R: Send + 'static> Publisher<R> for SwitchOnFirstPublisher<T, R> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<R>>) {
    let control = ControlSubscriber::new(subscriber);
    let main = SwitchOnFirstMain::new(control.clone(), self.transform.clone(), self.cancel_source_on_complete);
    control.attach(Arc::downgrade(&main));
    control.downstream.on_subscribe(control.clone());
    self.source.subscribe(main);
  }
}

struct SwitchOnFirstMain<T: Send + 'static, R: Send + 'static> {
  weak_self:                 Weak<Self>,
  state:                     AtomicU32,
  upstream:                  DeferredSubscription<T>,
  inner:                     Mutex<Option<Arc<dyn CoreSubscriber<T>>>>,
  // `Some(None)` is a stored completion, `Some(Some(e))` a stored
  // failure awaiting replay on inner subscribe.
  stored_terminal:           Mutex<Option<Option<StreamError>>>,
  control:                   Arc<ControlSubscriber<T, R>>,
  transform:                 Transform<T, R>,
  cancel_source_on_complete: bool,
}

impl<T: Send + 'static, R: Send + 'static> SwitchOnFirstMain<T, R> {
  fn new(control: Arc<ControlSubscriber<T, R>>, transform: Transform<T, R>, cancel_source_on_complete: bool) -> Arc<Self> {
    Arc::new_cyclic(|weak_self| Self {
      weak_self: weak_self.clone(),
      state: AtomicU32::new(0),
      upstream: DeferredSubscription::new(),
      inner: Mutex::new(None),
      stored_terminal: Mutex::new(None),
      control,
      transform,
      cancel_source_on_complete,
    })
  }

  fn mark(&self, flags: u32) -> u32 {
    self.state.fetch_or(flags, Ordering::AcqRel)
  }

  fn read(&self) -> u32 {
    self.state.load(Ordering::Acquire)
  }

  fn context(&self) -> Context {
    self.control.downstream.context()
  }

  fn remainder(&self) -> Flux<T> {
    let publisher: Arc<dyn Publisher<T>> = match self.weak_self.upgrade() {
      | Some(this) => this,
      | None => return Flux::empty(),
    };
    Flux::from_publisher(publisher)
  }

  fn launch_outbound(&self, signal: Signal<T>) {
    let outbound = (self.transform)(signal, self.remainder());
    self.mark(OUTBOUND_SUBSCRIBED);
    outbound.subscribe_with(self.control.clone());
  }

  fn deliver_inner_terminal(&self, inner: &Arc<dyn CoreSubscriber<T>>, terminal: Option<StreamError>) {
    self.mark(INBOUND_TERMINATED);
    match terminal {
      | Some(error) => inner.on_error(error),
      | None => inner.on_complete(),
    }
  }

  fn replay_stored_terminal(&self) {
    let terminal = self.stored_terminal.lock().take();
    let Some(terminal) = terminal else {
      return;
    };
    let inner = self.inner.lock().clone();
    match inner {
      | Some(inner) => self.deliver_inner_terminal(&inner, terminal),
      | None => *self.stored_terminal.lock() = Some(terminal),
    }
  }

  /// Cancels the inbound side; `signal_inner` additionally errors a
  /// live inner subscriber with a cancellation.
  fn cancel_inbound(&self, signal_inner: bool) {
    let pre = self.mark(INBOUND_CANCELLED);
    if has(pre, INBOUND_CANCELLED) {
      return;
    }
    self.upstream.cancel();
    if signal_inner && !has(pre, INBOUND_TERMINATED) {
      let inner = self.inner.lock().clone();
      if let Some(inner) = inner {
        self.deliver_inner_terminal(&inner, Some(StreamError::Cancelled));
      }
    }
  }

  fn inbound_terminal(&self, terminal: Option<StreamError>) {
    let pre = self.mark(FIRST_RECEIVED | INBOUND_TERMINATED);
    if has(pre, INBOUND_TERMINATED) {
      if let Some(error) = terminal {
        hooks::on_error_dropped(&error, &self.context());
      }
      return;
    }
    if !has(pre, FIRST_RECEIVED) {
      // Empty or failed before the first value: the transform receives
      // the terminal signal itself, and the remainder replays it.
      let signal = match &terminal {
        | Some(error) => Signal::Error(error.clone()),
        | None => Signal::Complete,
      };
      *self.stored_terminal.lock() = Some(terminal);
      self.launch_outbound(signal);
      self.replay_stored_terminal();
      return;
    }
    if has(pre, INBOUND_CANCELLED) {
      if let Some(error) = terminal {
        hooks::on_error_dropped(&error, &self.context());
      }
      return;
    }
    let inner = self.inner.lock().clone();
    match inner {
      | Some(inner) => self.deliver_inner_terminal(&inner, terminal),
      | None => {
        *self.stored_terminal.lock() = Some(terminal);
        self.replay_stored_terminal();
      },
    }
  }
}

impl<T: Send + 'static, R: Send + 'static> CoreSubscriber<T> for SwitchOnFirstMain<T, R> {
  fn context(&self) -> Context {
    self.control.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    if self.upstream.set(subscription) {
      self.upstream.request(1);
    }
  }

  fn on_next(&self, value: T) {
    let pre = self.mark(FIRST_RECEIVED);
    if !has(pre, FIRST_RECEIVED) {
      if has(pre, INBOUND_CANCELLED) || has(pre, INBOUND_TERMINATED) {
        hooks::on_next_dropped(value, &self.context());
        return;
      }
      self.launch_outbound(Signal::Next(value));
      return;
    }
    let state = self.read();
    if has(state, INBOUND_CANCELLED) || has(state, INBOUND_TERMINATED) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    let inner = self.inner.lock().clone();
    match inner {
      | Some(inner) => inner.on_next(value),
      | None => hooks::on_next_dropped(value, &self.context()),
    }
  }

  fn try_on_next(&self, value: T) -> bool {
    let state = self.read();
    if !has(state, FIRST_RECEIVED) {
      self.on_next(value);
      return true;
    }
    if has(state, INBOUND_CANCELLED) || has(state, INBOUND_TERMINATED) {
      hooks::on_next_dropped(value, &self.context());
      return true;
    }
    let inner = self.inner.lock().clone();
    match inner {
      | Some(inner) => inner.try_on_next(value),
      | None => {
        hooks::on_next_dropped(value, &self.context());
        true
      },
    }
  }

  fn is_conditional(&self) -> bool {
    self.inner.lock().as_ref().map_or(false, |inner| inner.is_conditional())
  }

  fn on_error(&self, error: StreamError) {
    self.inbound_terminal(Some(error));
  }

  fn on_complete(&self) {
    self.inbound_terminal(None);
  }
}

/// The remainder sequence the transform may subscribe once.
impl<T: Send + 'static, R: Send + 'static> Publisher<T> for SwitchOnFirstMain<T, R> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    let pre = self.mark(INBOUND_SUBSCRIBED_ONCE);
    if has(pre, INBOUND_SUBSCRIBED_ONCE) {
      error_only(&subscriber, StreamError::InnerAlreadySubscribed);
      return;
    }
    if has(pre, INBOUND_CANCELLED) {
      error_only(&subscriber, StreamError::Cancelled);
      return;
    }
    *self.inner.lock() = Some(subscriber.clone());
    self.mark(INBOUND_SUBSCRIBER_SET);
    let Some(main) = self.weak_self.upgrade() else {
      return;
    };
    subscriber.on_subscribe(Arc::new(InboundSubscription { main }));
    self.replay_stored_terminal();
  }
}

struct InboundSubscription<T: Send + 'static, R: Send + 'static> {
  main: Arc<SwitchOnFirstMain<T, R>>,
}

impl<T: Send + 'static, R: Send + 'static> Subscription<T> for InboundSubscription<T, R> {
  fn request(&self, n: u64) {
    if let Err(error) = validate_demand(n) {
      let inner = self.main.inner.lock().clone();
      if let Some(inner) = inner {
        self.main.deliver_inner_terminal(&inner, Some(error));
      }
      return;
    }
    self.main.mark(INBOUND_REQUESTED_ONCE);
    self.main.upstream.request(n);
  }

  fn cancel(&self) {
    self.main.cancel_inbound(false);
  }
}

struct ControlSubscriber<T: Send + 'static, R: Send + 'static> {
  downstream: Arc<dyn CoreSubscriber<R>>,
  outbound:   DeferredSubscription<R>,
  main:       Mutex<Option<Weak<SwitchOnFirstMain<T, R>>>>,
}

impl<T: Send + 'static, R: Send + 'static> ControlSubscriber<T, R> {
  fn new(downstream: Arc<dyn CoreSubscriber<R>>) -> Arc<Self> {
    Arc::new(Self { downstream, outbound: DeferredSubscription::new(), main: Mutex::new(None) })
  }

  fn attach(&self, main: Weak<SwitchOnFirstMain<T, R>>) {
    *self.main.lock() = Some(main);
  }

  fn with_main(&self) -> Option<Arc<SwitchOnFirstMain<T, R>>> {
    self.main.lock().as_ref().and_then(Weak::upgrade)
  }

  fn outbound_terminated(&self, errored: bool) {
    let Some(main) = self.with_main() else {
      return;
    };
    let pre = main.mark(OUTBOUND_TERMINATED);
    if has(pre, OUTBOUND_TERMINATED) {
      return;
    }
    if !has(pre, INBOUND_TERMINATED) {
      let inner_subscribed = has(pre, INBOUND_SUBSCRIBED_ONCE);
      // An abandoned inbound would leak its subscription; the flag only
      // keeps it alive for a live inner subscriber.
      if errored || main.cancel_source_on_complete || !inner_subscribed {
        main.cancel_inbound(errored);
      }
    }
  }
}

impl<T: Send + 'static, R: Send + 'static> CoreSubscriber<R> for ControlSubscriber<T, R> {
  fn context(&self) -> Context {
    self.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<R>>) {
    self.outbound.set(subscription);
  }

  fn on_next(&self, value: R) {
    self.downstream.on_next(value);
  }

  fn on_error(&self, error: StreamError) {
    self.downstream.on_error(error);
    self.outbound_terminated(true);
  }

  fn on_complete(&self) {
    self.downstream.on_complete();
    self.outbound_terminated(false);
  }
}

impl<T: Send + 'static, R: Send + 'static> Subscription<R> for ControlSubscriber<T, R> {
  fn request(&self, n: u64) {
    self.outbound.request(n);
  }

  fn cancel(&self) {
    let Some(main) = self.with_main() else {
      self.outbound.cancel();
      return;
    };
    let pre = main.mark(OUTBOUND_CANCELLED);
    if has(pre, OUTBOUND_CANCELLED) {
      return;
    }
    self.outbound.cancel();
    if !has(pre, INBOUND_TERMINATED) {
      main.cancel_inbound(true);
    }
  }
}
