use alloc::{collections::VecDeque, sync::Arc};

use spin::Mutex;

use super::{
  context::Context, hooks, signal::Signal, stream_error::StreamError, subscriber::CoreSubscriber,
  subscription::Subscription,
};


struct SerializedState<T> {
  emitting: bool,
  done:     bool,
  backlog:  VecDeque<Signal<T>>,
}

/// Decorator enforcing serial signal delivery (Rule 1.3).
///
/// Operators whose producers may race (windowing, combine-latest,
/// multicast sinks) wrap their downstream in this. The first thread to
/// arrive becomes the emitter and drains the backlog other threads
/// leave behind, so the wrapped subscriber only ever sees one thread
/// at a time.
pub struct SerializedSubscriber<T> {
  downstream: Arc<dyn CoreSubscriber<T>>,
  state:      Mutex<SerializedState<T>>,
}

impl<T: Send + 'static> SerializedSubscriber<T> {
  /// Wraps a downstream subscriber.
  #[must_use]
  pub fn new(downstream: Arc<dyn CoreSubscriber<T>>) -> Self {
    Self {
      downstream,
      state: Mutex::new(SerializedState { emitting: false, done: false, backlog: VecDeque::new() }),
    }
  }

  fn emit(&self, signal: Signal<T>) {
    let mut first = {
      let mut state = self.state.lock();
      if state.done {
        drop(state);
        self.drop_signal(signal);
        return;
      }
      if signal.is_terminal() {
        state.done = true;
      }
      if state.emitting {
        state.backlog.push_back(signal);
        return;
      }
      state.emitting = true;
      signal
    };
    loop {
      match first {
        | Signal::Next(value) => self.downstream.on_next(value),
        | Signal::Error(error) => self.downstream.on_error(error),
        | Signal::Complete => self.downstream.on_complete(),
      }
      let mut state = self.state.lock();
      match state.backlog.pop_front() {
        | Some(next) => first = next,
        | None => {
          state.emitting = false;
          return;
        },
      }
    }
  }

  fn drop_signal(&self, signal: Signal<T>) {
    match signal {
      | Signal::Next(value) => hooks::on_next_dropped(value, &self.downstream.context()),
      | Signal::Error(error) => hooks::on_error_dropped(&error, &self.downstream.context()),
      | Signal::Complete => {},
    }
  }
}

impl<T: Send + 'static> CoreSubscriber<T> for SerializedSubscriber<T> {
  fn context(&self) -> Context {
    self.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    self.downstream.on_subscribe(subscription);
  }

  fn on_next(&self, value: T) {
    self.emit(Signal::Next(value));
  }

  fn on_error(&self, error: StreamError) {
    self.emit(Signal::Error(error));
  }

  fn on_complete(&self) {
    self.emit(Signal::Complete);
  }
}
