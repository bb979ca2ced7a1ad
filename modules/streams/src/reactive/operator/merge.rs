use alloc::{boxed::Box, sync::Arc, vec::Vec};

use portable_atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use runnel_utils_core_rs::collections::queue::{QueueFactory, SpscQueue};
use spin::Mutex;

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
  support::{add_cap_atomic, produced, validate_demand},
};

#[cfg(test)]
mod tests;

/// Eager merge of a fixed list of sources.
///
/// Every source runs under a bounded prefetch queue; one
/// work-in-progress drain loop interleaves the queues round-robin
/// under downstream demand. Errors either stop everything immediately
/// or, in delay mode, are gathered and emitted once every source has
/// been drained.
pub(crate) struct MergePublisher<T: Send + 'static> {
  sources:     Vec<Arc<dyn Publisher<T>>>,
  prefetch:    usize,
  delay_error: bool,
}

impl<T: Send + 'static> MergePublisher<T> {
  pub(crate) fn new(sources: Vec<Arc<dyn Publisher<T>>>, prefetch: usize, delay_error: bool) -> Self {
    Self { sources, prefetch: prefetch.max(1), delay_error }
  }
}

impl<T: Send + 'static> Publisher<T> for MergePublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    if self.sources.is_empty() {
      crate::reactive::support::complete_only(&subscriber);
      return;
    }
    let main = MergeMain::new(subscriber, self.sources.len(), self.prefetch, self.delay_error);
    main.downstream.on_subscribe(main.clone());
    for (index, source) in self.sources.iter().enumerate() {
      source.subscribe(Arc::new(MergeInnerSubscriber { main: main.clone(), index }));
    }
  }
}

struct MergeInner<T: Send + 'static> {
  queue:    Box<dyn SpscQueue<T>>,
  upstream: DeferredSubscription<T>,
  consumed: AtomicU64,
  done:     AtomicBool,
}

struct MergeMain<T: Send + 'static> {
  downstream:  Arc<dyn CoreSubscriber<T>>,
  inners:      Vec<MergeInner<T>>,
  prefetch:    usize,
  limit:       u64,
  requested:   AtomicU64,
  wip:         AtomicUsize,
  cancelled:   AtomicBool,
  terminated:  AtomicBool,
  finished:    AtomicUsize,
  delay_error: bool,
  errors:      Mutex<Vec<StreamError>>,
}

impl<T: Send + 'static> MergeMain<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<T>>, count: usize, prefetch: usize, delay_error: bool) -> Arc<Self> {
    let inners = (0..count)
      .map(|_| MergeInner {
        queue:    QueueFactory::for_capacity(prefetch),
        upstream: DeferredSubscription::new(),
        consumed: AtomicU64::new(0),
        done:     AtomicBool::new(false),
      })
      .collect();
    Arc::new(Self {
      downstream,
      inners,
      prefetch,
      limit: (prefetch - (prefetch >> 2)).max(1) as u64,
      requested: AtomicU64::new(0),
      wip: AtomicUsize::new(0),
      cancelled: AtomicBool::new(false),
      terminated: AtomicBool::new(false),
      finished: AtomicUsize::new(0),
      delay_error,
      errors: Mutex::new(Vec::new()),
    })
  }

  fn fail_fast(&self, error: StreamError) {
    if self.terminated.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.downstream.context());
      return;
    }
    self.cancelled.store(true, Ordering::Release);
    for inner in &self.inners {
      inner.upstream.cancel();
    }
    self.downstream.on_error(error);
    self.drain();
  }

  fn drain(&self) {
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    let mut missed = 1;
    loop {
      if self.cancelled.load(Ordering::Acquire) {
        let context = self.downstream.context();
        for inner in &self.inners {
          inner.queue.clear_with(&mut |value| hooks::on_discard(value, &context));
        }
      } else {
        self.drain_round();
      }
      missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
      if missed == 0 {
        return;
      }
    }
  }

  fn drain_round(&self) {
    loop {
      let requested = self.requested.load(Ordering::Acquire);
      let mut emitted = 0_u64;
      while emitted < requested {
        if self.cancelled.load(Ordering::Acquire) {
          return;
        }
        let mut any = false;
        for inner in &self.inners {
          if emitted >= requested {
            break;
          }
          if let Some(value) = inner.queue.poll() {
            any = true;
            emitted += 1;
            self.downstream.on_next(value);
            let consumed = inner.consumed.fetch_add(1, Ordering::AcqRel) + 1;
            if consumed >= self.limit && !inner.done.load(Ordering::Acquire) {
              inner.consumed.store(0, Ordering::Relaxed);
              inner.upstream.request(consumed);
            }
          }
        }
        if !any {
          break;
        }
      }
      if emitted > 0 {
        produced(&self.requested, emitted);
      }
      if self.check_terminated() {
        return;
      }
      if emitted == 0 || self.requested.load(Ordering::Acquire) == 0 {
        return;
      }
    }
  }

  fn check_terminated(&self) -> bool {
    if self.finished.load(Ordering::Acquire) != self.inners.len() {
      return false;
    }
    if self.inners.iter().any(|inner| !inner.queue.is_empty()) {
      return false;
    }
    if self.terminated.swap(true, Ordering::AcqRel) {
      return true;
    }
    let mut errors = self.errors.lock();
    if errors.is_empty() {
      drop(errors);
      self.downstream.on_complete();
    } else {
      let error = if errors.len() == 1 {
        errors.remove(0)
      } else {
        StreamError::Composite(core::mem::take(&mut *errors))
      };
      drop(errors);
      self.downstream.on_error(error);
    }
    true
  }
}

struct MergeInnerSubscriber<T: Send + 'static> {
  main:  Arc<MergeMain<T>>,
  index: usize,
}

impl<T: Send + 'static> CoreSubscriber<T> for MergeInnerSubscriber<T> {
  fn context(&self) -> Context {
    self.main.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    let inner = &self.main.inners[self.index];
    if inner.upstream.set(subscription) {
      inner.upstream.request(self.main.prefetch as u64);
    }
  }

  fn on_next(&self, value: T) {
    let inner = &self.main.inners[self.index];
    if inner.done.load(Ordering::Acquire) || self.main.terminated.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    if let Err(value) = inner.queue.offer(value) {
      let context = self.context();
      hooks::on_discard(value, &context);
      self.main.fail_fast(StreamError::Overflow { stage: "merge" });
      return;
    }
    self.main.drain();
  }

  fn on_error(&self, error: StreamError) {
    let inner = &self.main.inners[self.index];
    if inner.done.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.context());
      return;
    }
    if self.main.delay_error {
      self.main.errors.lock().push(error);
      self.main.finished.fetch_add(1, Ordering::AcqRel);
      self.main.drain();
    } else {
      self.main.finished.fetch_add(1, Ordering::AcqRel);
      self.main.fail_fast(error);
    }
  }

  fn on_complete(&self) {
    let inner = &self.main.inners[self.index];
    if !inner.done.swap(true, Ordering::AcqRel) {
      self.main.finished.fetch_add(1, Ordering::AcqRel);
      self.main.drain();
    }
  }
}

impl<T: Send + 'static> Subscription<T> for MergeMain<T> {
  fn request(&self, n: u64) {
    if let Err(error) = validate_demand(n) {
      self.fail_fast(error);
      return;
    }
    add_cap_atomic(&self.requested, n);
    self.drain();
  }

  fn cancel(&self) {
    if self.cancelled.swap(true, Ordering::AcqRel) {
      return;
    }
    for inner in &self.inners {
      inner.upstream.cancel();
    }
    self.drain();
  }
}
