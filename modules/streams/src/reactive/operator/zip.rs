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

/// Shared per-source leg of a zip machine.
struct ZipSide<T: Send + 'static> {
  queue:    Box<dyn SpscQueue<T>>,
  upstream: DeferredSubscription<T>,
  consumed: AtomicU64,
  done:     AtomicBool,
}

impl<T: Send + 'static> ZipSide<T> {
  fn new(prefetch: usize) -> Self {
    Self {
      queue:    QueueFactory::for_capacity(prefetch),
      upstream: DeferredSubscription::new(),
      consumed: AtomicU64::new(0),
      done:     AtomicBool::new(false),
    }
  }

  fn refill(&self, limit: u64) {
    let consumed = self.consumed.fetch_add(1, Ordering::AcqRel) + 1;
    if consumed >= limit && !self.done.load(Ordering::Acquire) {
      self.consumed.store(0, Ordering::Relaxed);
      self.upstream.request(consumed);
    }
  }

  fn drained_out(&self) -> bool {
    self.done.load(Ordering::Acquire) && self.queue.is_empty()
  }
}

/// Positional pairing of two sequences.
///
/// Each source runs under a prefetch queue; a row is emitted only when
/// both queues have a head, and the prefetch is refilled fairly as
/// rows are consumed. Either source running out ends the sequence.
pub(crate) struct ZipPublisher<T: Send + 'static, U: Send + 'static, R: Send + 'static> {
  first:    Arc<dyn Publisher<T>>,
  second:   Arc<dyn Publisher<U>>,
  combiner: Arc<dyn Fn(T, U) -> R + Send + Sync>,
  prefetch: usize,
}

impl<T: Send + 'static, U: Send + 'static, R: Send + 'static> ZipPublisher<T, U, R> {
  pub(crate) fn new(
    first: Arc<dyn Publisher<T>>,
    second: Arc<dyn Publisher<U>>,
    combiner: Arc<dyn Fn(T, U) -> R + Send + Sync>,
    prefetch: usize,
  ) -> Self {
    Self { first, second, combiner, prefetch: prefetch.max(1) }
  }
}

impl<T: Send + 'static, U: Send + 'static, R: Send + 'static> Publisher<R> for ZipPublisher<T, U, R> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<R>>) {
    let main = ZipMain::new(subscriber, self.combiner.clone(), self.prefetch);
    main.downstream.on_subscribe(main.clone());
    self.first.subscribe(Arc::new(ZipFirstSubscriber { main: main.clone() }));
    self.second.subscribe(Arc::new(ZipSecondSubscriber { main: main.clone() }));
  }
}

struct ZipMain<T: Send + 'static, U: Send + 'static, R: Send + 'static> {
  downstream: Arc<dyn CoreSubscriber<R>>,
  combiner:   Arc<dyn Fn(T, U) -> R + Send + Sync>,
  first:      ZipSide<T>,
  second:     ZipSide<U>,
  prefetch:   u64,
  limit:      u64,
  requested:  AtomicU64,
  wip:        AtomicUsize,
  cancelled:  AtomicBool,
  terminated: AtomicBool,
  // Head of the first queue already taken but not yet paired.
  head:       Mutex<Option<T>>,
}

impl<T: Send + 'static, U: Send + 'static, R: Send + 'static> ZipMain<T, U, R> {
  fn new(
    downstream: Arc<dyn CoreSubscriber<R>>,
    combiner: Arc<dyn Fn(T, U) -> R + Send + Sync>,
    prefetch: usize,
  ) -> Arc<Self> {
    Arc::new(Self {
      downstream,
      combiner,
      first: ZipSide::new(prefetch),
      second: ZipSide::new(prefetch),
      prefetch: prefetch as u64,
      limit: (prefetch - (prefetch >> 2)).max(1) as u64,
      requested: AtomicU64::new(0),
      wip: AtomicUsize::new(0),
      cancelled: AtomicBool::new(false),
      terminated: AtomicBool::new(false),
      head: Mutex::new(None),
    })
  }

  fn fail(&self, error: StreamError) {
    if self.terminated.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.downstream.context());
      return;
    }
    self.cancelled.store(true, Ordering::Release);
    self.first.upstream.cancel();
    self.second.upstream.cancel();
    self.downstream.on_error(error);
    self.drain();
  }

  fn discard_head(&self) {
    let head = self.head.lock().take();
    if let Some(value) = head {
      hooks::on_discard(value, &self.downstream.context());
    }
  }

  fn drain(&self) {
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    let mut missed = 1;
    loop {
      if self.cancelled.load(Ordering::Acquire) {
        let context = self.downstream.context();
        self.first.queue.clear_with(&mut |value| hooks::on_discard(value, &context));
        self.second.queue.clear_with(&mut |value| hooks::on_discard(value, &context));
        self.discard_head();
      } else {
        self.drain_rows();
      }
      missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
      if missed == 0 {
        return;
      }
    }
  }

  fn drain_rows(&self) {
    loop {
      let requested = self.requested.load(Ordering::Acquire);
      let mut emitted = 0_u64;
      while emitted < requested {
        if self.cancelled.load(Ordering::Acquire) {
          return;
        }
        let mut head = self.head.lock();
        if head.is_none() {
          *head = self.first.queue.poll();
        }
        if head.is_none() || self.second.queue.is_empty() {
          drop(head);
          break;
        }
        let Some(b) = self.second.queue.poll() else {
          drop(head);
          break;
        };
        let Some(a) = head.take() else {
          drop(head);
          break;
        };
        drop(head);
        self.first.refill(self.limit);
        self.second.refill(self.limit);
        emitted += 1;
        self.downstream.on_next((self.combiner)(a, b));
      }
      if emitted > 0 {
        produced(&self.requested, emitted);
      }
      if self.check_done() {
        return;
      }
      if emitted == 0 {
        return;
      }
    }
  }

  fn check_done(&self) -> bool {
    let first_dry = self.first.drained_out() && self.head.lock().is_none();
    let second_dry = self.second.drained_out();
    if !first_dry && !second_dry {
      return false;
    }
    // A row can never form again once either side ran dry.
    if !self.terminated.swap(true, Ordering::AcqRel) {
      self.cancelled.store(true, Ordering::Release);
      self.first.upstream.cancel();
      self.second.upstream.cancel();
      let context = self.downstream.context();
      self.first.queue.clear_with(&mut |value| hooks::on_discard(value, &context));
      self.second.queue.clear_with(&mut |value| hooks::on_discard(value, &context));
      self.discard_head();
      self.downstream.on_complete();
    }
    true
  }
}

impl<T: Send + 'static, U: Send + 'static, R: Send + 'static> Subscription<R> for ZipMain<T, U, R> {
  fn request(&self, n: u64) {
    if let Err(error) = validate_demand(n) {
      self.fail(error);
      return;
    }
    add_cap_atomic(&self.requested, n);
    self.drain();
  }

  fn cancel(&self) {
    if self.cancelled.swap(true, Ordering::AcqRel) {
      return;
    }
    self.first.upstream.cancel();
    self.second.upstream.cancel();
    self.drain();
  }
}

struct ZipFirstSubscriber<T: Send + 'static, U: Send + 'static, R: Send + 'static> {
  main: Arc<ZipMain<T, U, R>>,
}

impl<T: Send + 'static, U: Send + 'static, R: Send + 'static> CoreSubscriber<T> for ZipFirstSubscriber<T, U, R> {
  fn context(&self) -> Context {
    self.main.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    if self.main.first.upstream.set(subscription) {
      self.main.first.upstream.request(self.main.prefetch);
    }
  }

  fn on_next(&self, value: T) {
    if self.main.terminated.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    if let Err(value) = self.main.first.queue.offer(value) {
      hooks::on_discard(value, &self.context());
      self.main.fail(StreamError::Overflow { stage: "zip" });
      return;
    }
    self.main.drain();
  }

  fn on_error(&self, error: StreamError) {
    self.main.fail(error);
  }

  fn on_complete(&self) {
    self.main.first.done.store(true, Ordering::Release);
    self.main.drain();
  }
}

struct ZipSecondSubscriber<T: Send + 'static, U: Send + 'static, R: Send + 'static> {
  main: Arc<ZipMain<T, U, R>>,
}

impl<T: Send + 'static, U: Send + 'static, R: Send + 'static> CoreSubscriber<U> for ZipSecondSubscriber<T, U, R> {
  fn context(&self) -> Context {
    self.main.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<U>>) {
    if self.main.second.upstream.set(subscription) {
      self.main.second.upstream.request(self.main.prefetch);
    }
  }

  fn on_next(&self, value: U) {
    if self.main.terminated.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    if let Err(value) = self.main.second.queue.offer(value) {
      hooks::on_discard(value, &self.context());
      self.main.fail(StreamError::Overflow { stage: "zip" });
      return;
    }
    self.main.drain();
  }

  fn on_error(&self, error: StreamError) {
    self.main.fail(error);
  }

  fn on_complete(&self) {
    self.main.second.done.store(true, Ordering::Release);
    self.main.drain();
  }
}

/// N-ary zip of same-typed sources into row vectors.
pub(crate) struct ZipAllPublisher<T: Send + 'static> {
  sources:  Vec<Arc<dyn Publisher<T>>>,
  prefetch: usize,
}

impl<T: Send + 'static> ZipAllPublisher<T> {
  pub(crate) fn new(sources: Vec<Arc<dyn Publisher<T>>>, prefetch: usize) -> Self {
    Self { sources, prefetch: prefetch.max(1) }
  }
}

impl<T: Send + 'static> Publisher<Vec<T>> for ZipAllPublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<Vec<T>>>) {
    if self.sources.is_empty() {
      crate::reactive::support::complete_only(&subscriber);
      return;
    }
    let main = ZipAllMain::new(subscriber, self.sources.len(), self.prefetch);
    main.downstream.on_subscribe(main.clone());
    for (index, source) in self.sources.iter().enumerate() {
      source.subscribe(Arc::new(ZipAllSubscriber { main: main.clone(), index }));
    }
  }
}

struct ZipAllMain<T: Send + 'static> {
  downstream: Arc<dyn CoreSubscriber<Vec<T>>>,
  sides:      Vec<ZipSide<T>>,
  prefetch:   u64,
  limit:      u64,
  requested:  AtomicU64,
  wip:        AtomicUsize,
  cancelled:  AtomicBool,
  terminated: AtomicBool,
  row:        Mutex<Vec<Option<T>>>,
}

impl<T: Send + 'static> ZipAllMain<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<Vec<T>>>, count: usize, prefetch: usize) -> Arc<Self> {
    Arc::new(Self {
      downstream,
      sides: (0..count).map(|_| ZipSide::new(prefetch)).collect(),
      prefetch: prefetch as u64,
      limit: (prefetch - (prefetch >> 2)).max(1) as u64,
      requested: AtomicU64::new(0),
      wip: AtomicUsize::new(0),
      cancelled: AtomicBool::new(false),
      terminated: AtomicBool::new(false),
      row: Mutex::new((0..count).map(|_| None).collect()),
    })
  }

  fn fail(&self, error: StreamError) {
    if self.terminated.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.downstream.context());
      return;
    }
    self.cancelled.store(true, Ordering::Release);
    for side in &self.sides {
      side.upstream.cancel();
    }
    self.downstream.on_error(error);
    self.drain();
  }

  fn discard_everything(&self) {
    let context = self.downstream.context();
    for side in &self.sides {
      side.queue.clear_with(&mut |value| hooks::on_discard(value, &context));
    }
    let mut row = self.row.lock();
    for slot in row.iter_mut() {
      if let Some(value) = slot.take() {
        hooks::on_discard(value, &context);
      }
    }
  }

  fn drain(&self) {
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    let mut missed = 1;
    loop {
      if self.cancelled.load(Ordering::Acquire) {
        self.discard_everything();
      } else {
        self.drain_rows();
      }
      missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
      if missed == 0 {
        return;
      }
    }
  }

  fn drain_rows(&self) {
    loop {
      let requested = self.requested.load(Ordering::Acquire);
      let mut emitted = 0_u64;
      'rows: while emitted < requested {
        if self.cancelled.load(Ordering::Acquire) {
          return;
        }
        let mut row = self.row.lock();
        let mut exhausted = false;
        for (index, side) in self.sides.iter().enumerate() {
          if row[index].is_none() {
            match side.queue.poll() {
              | Some(value) => row[index] = Some(value),
              | None => {
                if side.done.load(Ordering::Acquire) {
                  exhausted = true;
                }
              },
            }
          }
        }
        let complete_row: Option<Vec<T>> =
          if row.iter().all(Option::is_some) { row.iter_mut().map(Option::take).collect() } else { None };
        drop(row);
        if let Some(complete_row) = complete_row {
          for side in &self.sides {
            side.refill(self.limit);
          }
          emitted += 1;
          self.downstream.on_next(complete_row);
          continue 'rows;
        }
        if exhausted {
          if !self.terminated.swap(true, Ordering::AcqRel) {
            self.cancelled.store(true, Ordering::Release);
            for side in &self.sides {
              side.upstream.cancel();
            }
            self.discard_everything();
            self.downstream.on_complete();
          }
          return;
        }
        break;
      }
      if emitted > 0 {
        produced(&self.requested, emitted);
      } else {
        return;
      }
    }
  }
}

impl<T: Send + 'static> Subscription<Vec<T>> for ZipAllMain<T> {
  fn request(&self, n: u64) {
    if let Err(error) = validate_demand(n) {
      self.fail(error);
      return;
    }
    add_cap_atomic(&self.requested, n);
    self.drain();
  }

  fn cancel(&self) {
    if self.cancelled.swap(true, Ordering::AcqRel) {
      return;
    }
    for side in &self.sides {
      side.upstream.cancel();
    }
    self.drain();
  }
}

struct ZipAllSubscriber<T: Send + 'static> {
  main:  Arc<ZipAllMain<T>>,
  index: usize,
}

impl<T: Send + 'static> CoreSubscriber<T> for ZipAllSubscriber<T> {
  fn context(&self) -> Context {
    self.main.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    let side = &self.main.sides[self.index];
    if side.upstream.set(subscription) {
      side.upstream.request(self.main.prefetch);
    }
  }

  fn on_next(&self, value: T) {
    if self.main.terminated.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    let side = &self.main.sides[self.index];
    if let Err(value) = side.queue.offer(value) {
      hooks::on_discard(value, &self.context());
      self.main.fail(StreamError::Overflow { stage: "zip_all" });
      return;
    }
    self.main.drain();
  }

  fn on_error(&self, error: StreamError) {
    self.main.fail(error);
  }

  fn on_complete(&self) {
    self.main.sides[self.index].done.store(true, Ordering::Release);
    self.main.drain();
  }
}
