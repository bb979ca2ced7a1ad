use alloc::{sync::Arc, vec::Vec};

use portable_atomic::{AtomicUsize, Ordering};

use crate::reactive::{
  context::Context, deferred_subscription::DeferredSubscription, hooks, publisher::Publisher,
  stream_error::StreamError, subscriber::CoreSubscriber, subscription::Subscription,
};

#[cfg(test)]
mod tests;

const NO_WINNER: usize = usize::MAX;

/// Mirrors whichever source signals first.
///
/// Until a winner emerges every source receives the downstream demand;
/// the first value or terminal decides the race, the losers are
/// cancelled, and their late signals go to the drop hooks.
pub(crate) struct RacePublisher<T: Send + 'static> {
  sources: Vec<Arc<dyn Publisher<T>>>,
}

impl<T: Send + 'static> RacePublisher<T> {
  pub(crate) fn new(sources: Vec<Arc<dyn Publisher<T>>>) -> Self {
    Self { sources }
  }
}

impl<T: Send + 'static> Publisher<T> for RacePublisher<T> {
  fn subscribe(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    if self.sources.is_empty() {
      crate::reactive::support::complete_only(&subscriber);
      return;
    }
    if self.sources.len() == 1 {
      self.sources[0].subscribe(subscriber);
      return;
    }
    let coordinator = RaceCoordinator::new(subscriber, self.sources.len());
    coordinator.downstream.on_subscribe(coordinator.clone());
    for (index, source) in self.sources.iter().enumerate() {
      source.subscribe(Arc::new(RaceInner { coordinator: coordinator.clone(), index }));
    }
  }
}

struct RaceCoordinator<T: Send + 'static> {
  downstream: Arc<dyn CoreSubscriber<T>>,
  upstreams:  Vec<DeferredSubscription<T>>,
  winner:     AtomicUsize,
}

impl<T: Send + 'static> RaceCoordinator<T> {
  fn new(downstream: Arc<dyn CoreSubscriber<T>>, count: usize) -> Arc<Self> {
    Arc::new(Self {
      downstream,
      upstreams: (0..count).map(|_| DeferredSubscription::new()).collect(),
      winner: AtomicUsize::new(NO_WINNER),
    })
  }

  /// Decides the race in favour of `index`; the first caller wins.
  fn try_win(&self, index: usize) -> bool {
    let current = self.winner.load(Ordering::Acquire);
    if current == index {
      return true;
    }
    if current != NO_WINNER {
      return false;
    }
    if self.winner.compare_exchange(NO_WINNER, index, Ordering::AcqRel, Ordering::Acquire).is_ok() {
      for (loser, upstream) in self.upstreams.iter().enumerate() {
        if loser != index {
          upstream.cancel();
        }
      }
      return true;
    }
    self.winner.load(Ordering::Acquire) == index
  }
}

impl<T: Send + 'static> Subscription<T> for RaceCoordinator<T> {
  fn request(&self, n: u64) {
    let winner = self.winner.load(Ordering::Acquire);
    if winner != NO_WINNER {
      self.upstreams[winner].request(n);
      return;
    }
    for upstream in &self.upstreams {
      upstream.request(n);
    }
  }

  fn cancel(&self) {
    for upstream in &self.upstreams {
      upstream.cancel();
    }
  }
}

struct RaceInner<T: Send + 'static> {
  coordinator: Arc<RaceCoordinator<T>>,
  index:       usize,
}

impl<T: Send + 'static> CoreSubscriber<T> for RaceInner<T> {
  fn context(&self) -> Context {
    self.coordinator.downstream.context()
  }

  fn on_subscribe(&self, subscription: Arc<dyn Subscription<T>>) {
    self.coordinator.upstreams[self.index].set(subscription);
  }

  fn on_next(&self, value: T) {
    if self.coordinator.try_win(self.index) {
      self.coordinator.downstream.on_next(value);
    } else {
      hooks::on_next_dropped(value, &self.context());
    }
  }

  fn on_error(&self, error: StreamError) {
    if self.coordinator.try_win(self.index) {
      self.coordinator.downstream.on_error(error);
    } else {
      hooks::on_error_dropped(&error, &self.context());
    }
  }

  fn on_complete(&self) {
    if self.coordinator.try_win(self.index) {
      self.coordinator.downstream.on_complete();
    }
  }
}
