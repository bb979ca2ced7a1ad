use alloc::{sync::Arc, vec::Vec};

use portable_atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use runnel_utils_core_rs::collections::queue::{SpscLinkedQueue, SpscQueue};
use spin::Mutex;

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
  support::{add_cap_atomic, produced, validate_demand},
};

#[cfg(test)]
mod tests;

/// Combines the freshest value of two sequences on every change.
///
/// Emission starts once both sides produced at least one value; each
/// later value from either side yields one combination. Combinations
/// are staged through a queue drained under downstream demand. A side
/// completing before its first value ends the sequence, since no
/// combination can ever form.
pub(crate) struct CombineLatestPublisher<T, U, R>
where
  T: Clone + Send + Sync + 'static,
  U: Clone + Send + Sync + 'static,
  R: Send + 'static, {
  first:    Arc<dyn Publisher<T>>,
  second:   Arc<dyn Publisher<U>>,
  combiner: Arc<dyn Fn(&T, &U) -> R + Send + Sync>,
}

impl<T, U, R> CombineLatestPublisher<T, U, R>
where
  T: Clone + Send + Sync + 'static,
  U: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
  pub(crate) fn new(
    first: Arc<dyn Publisher<T>>,
    second: Arc<dyn Publisher<U>>,
    combiner: Arc<dyn Fn(&T, &U) -> R + Send + Sync>,
  ) -> Self {
    Self { first, second, combiner }
  }
}

impl<T, U, R> Publisher<R> for CombineLatestPublisher<T, U, R>
where
  T: Clone + Send + Sync + 'static,
  U: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<R>>) {
    let main = CombineLatestMain::new(subscriber, self.combiner.clone());
    main.downstream.on_subscribe(main.clone());
    self.first.subscribe(Arc::new(CombineLeft { main: main.clone() }));
    self.second.subscribe(Arc::new(CombineRight { main: main.clone() }));
  }
}

struct CombineLatestMain<T, U, R>
where
  T: Clone + Send + Sync + 'static,
  U: Clone + Send + Sync + 'static,
  R: Send + 'static, {
  downstream: Arc<dyn CoreSubscriber<R>>,
  combiner:   Arc<dyn Fn(&T, &U) -> R + Send + Sync>,
  // One lock for both latest slots keeps combination atomic.
  latest:     Mutex<(Option<T>, Option<U>)>,
  staged:     SpscLinkedQueue<R>,
  left_up:    DeferredSubscription<T>,
  right_up:   DeferredSubscription<U>,
  requested:  AtomicU64,
  wip:        AtomicUsize,
  cancelled:  AtomicBool,
  terminated: AtomicBool,
  finished:   AtomicUsize,
}

impl<T, U, R> CombineLatestMain<T, U, R>
where
  T: Clone + Send + Sync + 'static,
  U: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
  fn new(downstream: Arc<dyn CoreSubscriber<R>>, combiner: Arc<dyn Fn(&T, &U) -> R + Send + Sync>) -> Arc<Self> {
    Arc::new(Self {
      downstream,
      combiner,
      latest: Mutex::new((None, None)),
      staged: SpscLinkedQueue::new(),
      left_up: DeferredSubscription::new(),
      right_up: DeferredSubscription::new(),
      requested: AtomicU64::new(0),
      wip: AtomicUsize::new(0),
      cancelled: AtomicBool::new(false),
      terminated: AtomicBool::new(false),
      finished: AtomicUsize::new(0),
    })
  }

  /// Offers must happen under the `latest` lock: the two sides are the
  /// queue's producer and may run on different threads.
  fn stage_locked(&self, overflow: bool) {
    if overflow {
      self.fail(StreamError::Overflow { stage: "combine_latest" });
      return;
    }
    self.drain();
  }

  fn fail(&self, error: StreamError) {
    if self.terminated.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.downstream.context());
      return;
    }
    self.cancelled.store(true, Ordering::Release);
    self.left_up.cancel();
    self.right_up.cancel();
    self.downstream.on_error(error);
    self.drain();
  }

  /// A side finished; `starved` says it never produced a value.
  fn side_finished(&self, starved: bool) {
    let finished = self.finished.fetch_add(1, Ordering::AcqRel) + 1;
    if starved || finished == 2 {
      if starved {
        self.finished.store(2, Ordering::Release);
        self.left_up.cancel();
        self.right_up.cancel();
      }
      self.drain();
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
        self.staged.clear_with(&mut |value| hooks::on_discard(value, &context));
      } else {
        let requested = self.requested.load(Ordering::Acquire);
        let mut emitted = 0_u64;
        while emitted < requested {
          match self.staged.poll() {
            | Some(value) => {
              emitted += 1;
              self.downstream.on_next(value);
            },
            | None => break,
          }
        }
        if emitted > 0 {
          produced(&self.requested, emitted);
        }
        if self.finished.load(Ordering::Acquire) >= 2
          && self.staged.is_empty()
          && !self.terminated.swap(true, Ordering::AcqRel)
        {
          self.downstream.on_complete();
        }
      }
      missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
      if missed == 0 {
        return;
      }
    }
  }
}

impl<T, U, R> Subscription<R> for CombineLatestMain<T, U, R>
where
  T: Clone + Send + Sync + 'static,
  U: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
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
    self.left_up.cancel();
    self.right_up.cancel();
    self.drain();
  }
}

struct CombineLeft<T, U, R>
where
  T: Clone + Send + Sync + 'static,
  U: Clone + Send + Sync + 'static,
  R: Send + 'static, {
  main: Arc<CombineLatestMain<T, U, R>>,
}

impl<T, U, R> CoreSubscriber<T> for CombineLeft<T, U, R>
where
  T: Clone + Send + Sync + 'static,
  U: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
  fn context(&self) -> Context {
    self.main.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    if self.main.left_up.set(subscription) {
      self.main.left_up.request(u64::MAX);
    }
  }

  fn on_next(&self, value: T) {
    if self.main.terminated.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    let overflow = {
      let mut latest = self.main.latest.lock();
      latest.0 = Some(value);
      match (&latest.0, &latest.1) {
        | (Some(left), Some(right)) => {
          let combined = (self.main.combiner)(left, right);
          self.main.staged.offer(combined).is_err()
        },
        | _ => false,
      }
    };
    self.main.stage_locked(overflow);
  }

  fn on_error(&self, error: StreamError) {
    self.main.fail(error);
  }

  fn on_complete(&self) {
    let starved = self.main.latest.lock().0.is_none();
    self.main.side_finished(starved);
  }
}

struct CombineRight<T, U, R>
where
  T: Clone + Send + Sync + 'static,
  U: Clone + Send + Sync + 'static,
  R: Send + 'static, {
  main: Arc<CombineLatestMain<T, U, R>>,
}

impl<T, U, R> CoreSubscriber<U> for CombineRight<T, U, R>
where
  T: Clone + Send + Sync + 'static,
  U: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
  fn context(&self) -> Context {
    self.main.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<U>>) {
    if self.main.right_up.set(subscription) {
      self.main.right_up.request(u64::MAX);
    }
  }

  fn on_next(&self, value: U) {
    if self.main.terminated.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.context());
      return;
    }
    let overflow = {
      let mut latest = self.main.latest.lock();
      latest.1 = Some(value);
      match (&latest.0, &latest.1) {
        | (Some(left), Some(right)) => {
          let combined = (self.main.combiner)(left, right);
          self.main.staged.offer(combined).is_err()
        },
        | _ => false,
      }
    };
    self.main.stage_locked(overflow);
  }

  fn on_error(&self, error: StreamError) {
    self.main.fail(error);
  }

  fn on_complete(&self) {
    let starved = self.main.latest.lock().1.is_none();
    self.main.side_finished(starved);
  }
}

/// N-ary combine-latest over same-typed sources.
pub(crate) struct CombineLatestAllPublisher<T, R>
where
  T: Clone + Send + Sync + 'static,
  R: Send + 'static, {
  sources:  Vec<Arc<dyn Publisher<T>>>,
  combiner: Arc<dyn Fn(&[T]) -> R + Send + Sync>,
}

impl<T, R> CombineLatestAllPublisher<T, R>
where
  T: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
  pub(crate) fn new(sources: Vec<Arc<dyn Publisher<T>>>, combiner: Arc<dyn Fn(&[T]) -> R + Send + Sync>) -> Self {
    Self { sources, combiner }
  }
}

impl<T, R> Publisher<R> for CombineLatestAllPublisher<T, R>
where
  T: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<R>>) {
    if self.sources.is_empty() {
      crate::reactive::support::complete_only(&subscriber);
      return;
    }
    let main = CombineAllMain::new(subscriber, self.combiner.clone(), self.sources.len());
    main.downstream.on_subscribe(main.clone());
    for (index, source) in self.sources.iter().enumerate() {
      source.subscribe(Arc::new(CombineAllSubscriber { main: main.clone(), index }));
    }
  }
}

struct CombineAllMain<T, R>
where
  T: Clone + Send + Sync + 'static,
  R: Send + 'static, {
  downstream: Arc<dyn CoreSubscriber<R>>,
  combiner:   Arc<dyn Fn(&[T]) -> R + Send + Sync>,
  latest:     Mutex<Vec<Option<T>>>,
  staged:     SpscLinkedQueue<R>,
  upstreams:  Vec<DeferredSubscription<T>>,
  requested:  AtomicU64,
  wip:        AtomicUsize,
  cancelled:  AtomicBool,
  terminated: AtomicBool,
  finished:   AtomicUsize,
  sides:      usize,
}

impl<T, R> CombineAllMain<T, R>
where
  T: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
  fn new(downstream: Arc<dyn CoreSubscriber<R>>, combiner: Arc<dyn Fn(&[T]) -> R + Send + Sync>, sides: usize) -> Arc<Self> {
    Arc::new(Self {
      downstream,
      combiner,
      latest: Mutex::new((0..sides).map(|_| None).collect()),
      staged: SpscLinkedQueue::new(),
      upstreams: (0..sides).map(|_| DeferredSubscription::new()).collect(),
      requested: AtomicU64::new(0),
      wip: AtomicUsize::new(0),
      cancelled: AtomicBool::new(false),
      terminated: AtomicBool::new(false),
      finished: AtomicUsize::new(0),
      sides,
    })
  }

  fn value_arrived(&self, index: usize, value: T) {
    if self.terminated.load(Ordering::Acquire) {
      hooks::on_next_dropped(value, &self.downstream.context());
      return;
    }
    let overflow = {
      let mut latest = self.latest.lock();
      latest[index] = Some(value);
      if latest.iter().all(Option::is_some) {
        let row: Vec<T> = latest.iter().flatten().cloned().collect();
        let combined = (self.combiner)(&row);
        // Offer under the lock: the sides share the producer role.
        self.staged.offer(combined).is_err()
      } else {
        false
      }
    };
    if overflow {
      self.fail(StreamError::Overflow { stage: "combine_latest_all" });
      return;
    }
    self.drain();
  }

  fn fail(&self, error: StreamError) {
    if self.terminated.swap(true, Ordering::AcqRel) {
      hooks::on_error_dropped(&error, &self.downstream.context());
      return;
    }
    self.cancelled.store(true, Ordering::Release);
    for upstream in &self.upstreams {
      upstream.cancel();
    }
    self.downstream.on_error(error);
    self.drain();
  }

  fn side_finished(&self, starved: bool) {
    let finished = self.finished.fetch_add(1, Ordering::AcqRel) + 1;
    if starved {
      self.finished.store(self.sides, Ordering::Release);
      for upstream in &self.upstreams {
        upstream.cancel();
      }
      self.drain();
      return;
    }
    if finished == self.sides {
      self.drain();
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
        self.staged.clear_with(&mut |value| hooks::on_discard(value, &context));
      } else {
        let requested = self.requested.load(Ordering::Acquire);
        let mut emitted = 0_u64;
        while emitted < requested {
          match self.staged.poll() {
            | Some(value) => {
              emitted += 1;
              self.downstream.on_next(value);
            },
            | None => break,
          }
        }
        if emitted > 0 {
          produced(&self.requested, emitted);
        }
        if self.finished.load(Ordering::Acquire) >= self.sides
          && self.staged.is_empty()
          && !self.terminated.swap(true, Ordering::AcqRel)
        {
          self.downstream.on_complete();
        }
      }
      missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
      if missed == 0 {
        return;
      }
    }
  }
}

impl<T, R> Subscription<R> for CombineAllMain<T, R>
where
  T: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
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
    for upstream in &self.upstreams {
      upstream.cancel();
    }
    self.drain();
  }
}

struct CombineAllSubscriber<T, R>
where
  T: Clone + Send + Sync + 'static,
  R: Send + 'static, {
  main:  Arc<CombineAllMain<T, R>>,
  index: usize,
}

impl<T, R> CoreSubscriber<T> for CombineAllSubscriber<T, R>
where
  T: Clone + Send + Sync + 'static,
  R: Send + 'static,
{
  fn context(&self) -> Context {
    self.main.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    let upstream = &self.main.upstreams[self.index];
    if upstream.set(subscription) {
      upstream.request(u64::MAX);
    }
  }

  fn on_next(&self, value: T) {
    self.main.value_arrived(self.index, value);
  }

  fn on_error(&self, error: StreamError) {
    self.main.fail(error);
  }

  fn on_complete(&self) {
    let starved = self.main.latest.lock()[self.index].is_none();
    self.main.side_finished(starved);
  }
}
