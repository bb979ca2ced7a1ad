use alloc::{sync::Arc, vec::Vec};
use core::time::Duration;

use super::{
  lambda_subscriber::LambdaSubscriber,
  mono::Mono,
  operator::{
    buffer_count::BufferCountPublisher, buffer_when::BufferWhenPublisher, combine_latest::CombineLatestPublisher,
    combine_latest::CombineLatestAllPublisher, concat::ConcatPublisher, default_if_empty::DefaultIfEmptyPublisher,
    defer::DeferPublisher, distinct::DistinctPublisher, do_finally::DoFinallyPublisher, empty::EmptyPublisher,
    error_source::ErrorPublisher, filter::FilterPublisher, from_fn::CallablePublisher, from_iter::IterPublisher,
    from_vec::VecPublisher, hide::HidePublisher, ignore_elements::IgnoreElementsPublisher,
    interval::IntervalPublisher, just::JustPublisher, map::MapPublisher, merge::MergePublisher,
    on_error_resume::OnErrorResumePublisher, peek::{PeekCallbacks, PeekPublisher},
    publish_multicast::PublishMulticastPublisher, race::RacePublisher, range::RangePublisher, repeat::RepeatPublisher,
    retry::RetryPublisher, sample::SamplePublisher, scan::ScanPublisher, skip::SkipPublisher,
    skip_while::SkipWhilePublisher, switch_map::SwitchMapPublisher, switch_on_first::SwitchOnFirstPublisher,
    take::TakePublisher, take_while::TakeWhilePublisher, timeout::TimeoutPublisher, try_map::TryMapPublisher,
    using_when::UsingWhenPublisher, window_count::WindowCountPublisher, window_when::WindowWhenPublisher,
    zip::{ZipAllPublisher, ZipPublisher},
  },
  publisher::Publisher,
  scheduler::Scheduler,
  signal::Signal,
  stream_config::StreamConfig,
  stream_error::StreamError,
  subscriber::CoreSubscriber,
};

pub use super::operator::do_finally::FinallyKind;

#[cfg(test)]
mod tests;

/// Handle on a sequence of zero or more values.
///
/// A `Flux` is an immutable description of a pipeline: cloning and
/// sharing it is free, and every subscribe call installs a fresh
/// subscriber chain from sink to source. Values flow down through
/// `on_next` under the demand the sink raised through `request`.
pub struct Flux<T: Send + 'static> {
  source: Arc<dyn Publisher<T>>,
}

impl<T: Send + 'static> Clone for Flux<T> {
  fn clone(&self) -> Self {
    Self { source: self.source.clone() }
  }
}

impl<T: Send + 'static> Flux<T> {
  /// Wraps an existing publisher.
  #[must_use]
  pub fn from_publisher(source: Arc<dyn Publisher<T>>) -> Self {
    Self { source }
  }

  pub(crate) fn from_operator<P>(publisher: P) -> Self
  where
    P: Publisher<T> + 'static, {
    Self { source: Arc::new(publisher) }
  }

  pub(crate) fn raw_source(&self) -> Arc<dyn Publisher<T>> {
    self.source.clone()
  }

  /// Emits one value, then completes. Scalar sources grant sync
  /// fusion, so a fused downstream polls the value without any
  /// `on_next` traffic.
  #[must_use]
  pub fn just(value: T) -> Self
  where
    T: Clone + Sync, {
    Self::from_operator(JustPublisher::new(value))
  }

  /// Completes immediately without values.
  #[must_use]
  pub fn empty() -> Self {
    Self::from_operator(EmptyPublisher::new())
  }

  /// Fails immediately with the given error.
  #[must_use]
  pub fn error(error: StreamError) -> Self {
    Self::from_operator(ErrorPublisher::new(Arc::new(move || error.clone())))
  }

  /// Fails immediately, materializing the error lazily per subscriber.
  #[must_use]
  pub fn error_with<F>(supplier: F) -> Self
  where
    F: Fn() -> StreamError + Send + Sync + 'static, {
    Self::from_operator(ErrorPublisher::new(Arc::new(supplier)))
  }

  /// Builds the actual sequence lazily at subscribe time.
  #[must_use]
  pub fn defer<F>(supplier: F) -> Self
  where
    F: Fn() -> Self + Send + Sync + 'static, {
    Self::from_operator(DeferPublisher::new(Arc::new(supplier)))
  }

  /// Emits every element of a vector.
  #[must_use]
  pub fn from_vec(values: Vec<T>) -> Self
  where
    T: Clone + Sync, {
    Self::from_operator(VecPublisher::new(Arc::new(values)))
  }

  /// Emits every element produced by a cloneable iterable.
  #[must_use]
  pub fn from_iter<I>(iterable: I) -> Self
  where
    I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
    I::IntoIter: Send, {
    Self::from_operator(IterPublisher::new(iterable))
  }

  /// Emits at most one value produced by a callable.
  ///
  /// `Ok(None)` completes empty, `Err` fails the sequence.
  #[must_use]
  pub fn from_fn<F>(callable: F) -> Self
  where
    F: Fn() -> Result<Option<T>, StreamError> + Send + Sync + 'static, {
    Self::from_operator(CallablePublisher::new(Arc::new(callable)))
  }

  /// Subscribes the given subscriber to this sequence.
  pub fn subscribe_with(&self, subscriber: Arc<dyn CoreSubscriber<T>>) {
    self.source.subscribe(subscriber);
  }

  /// Subscribes with a value callback and unbounded demand.
  pub fn subscribe<F>(&self, on_next: F) -> Arc<LambdaSubscriber<T>>
  where
    F: Fn(T) + Send + Sync + 'static, {
    let subscriber = LambdaSubscriber::new(Some(Arc::new(on_next)), None, None);
    self.subscribe_with(subscriber.clone());
    subscriber
  }

  /// Subscribes with value, error, and completion callbacks.
  pub fn subscribe_with_handlers<N, E, C>(&self, on_next: N, on_error: E, on_complete: C) -> Arc<LambdaSubscriber<T>>
  where
    N: Fn(T) + Send + Sync + 'static,
    E: Fn(StreamError) + Send + Sync + 'static,
    C: Fn() + Send + Sync + 'static, {
    let subscriber = LambdaSubscriber::new(Some(Arc::new(on_next)), Some(Arc::new(on_error)), Some(Arc::new(on_complete)));
    self.subscribe_with(subscriber.clone());
    subscriber
  }

  /// Transforms every value.
  #[must_use]
  pub fn map<R, F>(self, mapper: F) -> Flux<R>
  where
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static, {
    Flux::from_operator(MapPublisher::new(self.source, Arc::new(mapper)))
  }

  /// Transforms every value through a fallible mapper; a failure
  /// cancels upstream, discards the input value, and errors downstream.
  #[must_use]
  pub fn try_map<R, F>(self, mapper: F) -> Flux<R>
  where
    R: Send + 'static,
    F: Fn(&T) -> Result<R, StreamError> + Send + Sync + 'static, {
    Flux::from_operator(TryMapPublisher::new(self.source, Arc::new(mapper)))
  }

  /// Keeps the values matching the predicate; refused values are
  /// discarded and, on the conditional path, do not consume demand.
  #[must_use]
  pub fn filter<F>(self, predicate: F) -> Self
  where
    F: Fn(&T) -> bool + Send + Sync + 'static, {
    Self::from_operator(FilterPublisher::new(self.source, Arc::new(predicate)))
  }

  /// Runs a callback before the subscriber chain is installed.
  #[must_use]
  pub fn do_first<F>(self, callback: F) -> Self
  where
    F: Fn() + Send + Sync + 'static, {
    Self::from_operator(PeekPublisher::new(self.source, PeekCallbacks::new().on_first(Arc::new(callback))))
  }

  /// Observes subscription installation.
  #[must_use]
  pub fn do_on_subscribe<F>(self, callback: F) -> Self
  where
    F: Fn() + Send + Sync + 'static, {
    Self::from_operator(PeekPublisher::new(self.source, PeekCallbacks::new().on_subscribe(Arc::new(callback))))
  }

  /// Observes every value.
  #[must_use]
  pub fn do_on_next<F>(self, callback: F) -> Self
  where
    F: Fn(&T) + Send + Sync + 'static, {
    Self::from_operator(PeekPublisher::new(self.source, PeekCallbacks::new().on_next(Arc::new(callback))))
  }

  /// Observes the failure terminal.
  #[must_use]
  pub fn do_on_error<F>(self, callback: F) -> Self
  where
    F: Fn(&StreamError) + Send + Sync + 'static, {
    Self::from_operator(PeekPublisher::new(self.source, PeekCallbacks::new().on_error(Arc::new(callback))))
  }

  /// Observes the completion terminal.
  #[must_use]
  pub fn do_on_complete<F>(self, callback: F) -> Self
  where
    F: Fn() + Send + Sync + 'static, {
    Self::from_operator(PeekPublisher::new(self.source, PeekCallbacks::new().on_complete(Arc::new(callback))))
  }

  /// Observes demand flowing upstream.
  #[must_use]
  pub fn do_on_request<F>(self, callback: F) -> Self
  where
    F: Fn(u64) + Send + Sync + 'static, {
    Self::from_operator(PeekPublisher::new(self.source, PeekCallbacks::new().on_request(Arc::new(callback))))
  }

  /// Observes cancellation.
  #[must_use]
  pub fn do_on_cancel<F>(self, callback: F) -> Self
  where
    F: Fn() + Send + Sync + 'static, {
    Self::from_operator(PeekPublisher::new(self.source, PeekCallbacks::new().on_cancel(Arc::new(callback))))
  }

  /// Runs a callback after any terminal or cancellation, exactly once,
  /// after the terminal handler itself.
  #[must_use]
  pub fn do_finally<F>(self, callback: F) -> Self
  where
    F: Fn(FinallyKind) + Send + Sync + 'static, {
    Self::from_operator(DoFinallyPublisher::new(self.source, Arc::new(callback)))
  }

  /// Emits only the first `n` values, then completes and cancels
  /// upstream.
  #[must_use]
  pub fn take(self, n: u64) -> Self {
    Self::from_operator(TakePublisher::new(self.source, n))
  }

  /// Drops the first `n` values.
  #[must_use]
  pub fn skip(self, n: u64) -> Self {
    Self::from_operator(SkipPublisher::new(self.source, n))
  }

  /// Emits values while the predicate holds, then completes.
  #[must_use]
  pub fn take_while<F>(self, predicate: F) -> Self
  where
    F: Fn(&T) -> bool + Send + Sync + 'static, {
    Self::from_operator(TakeWhilePublisher::new(self.source, Arc::new(predicate)))
  }

  /// Drops values while the predicate holds, then emits the rest.
  #[must_use]
  pub fn skip_while<F>(self, predicate: F) -> Self
  where
    F: Fn(&T) -> bool + Send + Sync + 'static, {
    Self::from_operator(SkipWhilePublisher::new(self.source, Arc::new(predicate)))
  }

  /// Hides the identity of this sequence, defeating fusion and
  /// assembly-time optimizations.
  #[must_use]
  pub fn hide(self) -> Self {
    Self::from_operator(HidePublisher::new(self.source))
  }

  /// Drops every value, forwarding only the terminal.
  #[must_use]
  pub fn ignore_elements(self) -> Mono<T> {
    Mono::from_operator(IgnoreElementsPublisher::new(self.source))
  }

  /// Emits a fallback value when the sequence completes empty.
  #[must_use]
  pub fn default_if_empty(self, value: T) -> Self
  where
    T: Clone + Sync, {
    Self::from_operator(DefaultIfEmptyPublisher::new(self.source, value))
  }

  /// Emits the running accumulation of an associative step function.
  #[must_use]
  pub fn scan<R, F>(self, seed: R, step: F) -> Flux<R>
  where
    R: Clone + Send + Sync + 'static,
    F: Fn(&R, T) -> R + Send + Sync + 'static, {
    Flux::from_operator(ScanPublisher::new(self.source, seed, Arc::new(step)))
  }

  /// Drops values already seen; refused values are discarded without
  /// consuming demand on the conditional path.
  #[must_use]
  pub fn distinct(self) -> Self
  where
    T: Clone + Eq + core::hash::Hash + Sync, {
    Self::from_operator(DistinctPublisher::new(self.source))
  }

  /// Emits the latest value each time the sampler emits.
  #[must_use]
  pub fn sample<U>(self, sampler: Flux<U>) -> Self
  where
    U: Send + 'static, {
    Self::from_operator(SamplePublisher::new(self.source, sampler.raw_source()))
  }

  /// Collects values into fixed-size buffers.
  #[must_use]
  pub fn buffer_count(self, size: usize) -> Flux<Vec<T>> {
    Flux::from_operator(BufferCountPublisher::new(self.source, size))
  }

  /// Collects values into buffers delimited by a boundary sequence.
  ///
  /// Each boundary signal closes the open buffer and emits it when
  /// non-empty; the final buffer is emitted on completion.
  #[must_use]
  pub fn buffer_when<U>(self, boundary: Flux<U>) -> Flux<Vec<T>>
  where
    U: Send + 'static, {
    Flux::from_operator(BufferWhenPublisher::new(self.source, boundary.raw_source()))
  }

  /// Splits the sequence into consecutive windows of `size` values.
  #[must_use]
  pub fn window_count(self, size: usize) -> Flux<Flux<T>> {
    Flux::from_operator(WindowCountPublisher::new(self.source, size))
  }

  /// Splits the sequence into windows delimited by a boundary
  /// sequence.
  #[must_use]
  pub fn window_when<U>(self, boundary: Flux<U>) -> Flux<Flux<T>>
  where
    U: Send + 'static, {
    Flux::from_operator(WindowWhenPublisher::new(self.source, boundary.raw_source()))
  }

  /// Concatenates the sources sequentially.
  #[must_use]
  pub fn concat(sources: Vec<Self>) -> Self {
    Self::from_operator(ConcatPublisher::new(sources.into_iter().map(|flux| flux.source).collect(), false))
  }

  /// Concatenates sequentially, delaying errors until every source
  /// has been drained.
  #[must_use]
  pub fn concat_delay_error(sources: Vec<Self>) -> Self {
    Self::from_operator(ConcatPublisher::new(sources.into_iter().map(|flux| flux.source).collect(), true))
  }

  /// Appends another sequence after this one completes.
  #[must_use]
  pub fn concat_with(self, other: Self) -> Self {
    Self::concat(alloc::vec![self, other])
  }

  /// Merges the sources eagerly, interleaving as values arrive.
  #[must_use]
  pub fn merge(sources: Vec<Self>) -> Self {
    Self::merge_with_prefetch(sources, StreamConfig::new().default_prefetch(), false)
  }

  /// Merges eagerly, delaying errors until all sources finished.
  #[must_use]
  pub fn merge_delay_error(sources: Vec<Self>) -> Self {
    Self::merge_with_prefetch(sources, StreamConfig::new().default_prefetch(), true)
  }

  /// Merges with an explicit per-source prefetch.
  #[must_use]
  pub fn merge_with_prefetch(sources: Vec<Self>, prefetch: usize, delay_error: bool) -> Self {
    Self::from_operator(MergePublisher::new(
      sources.into_iter().map(|flux| flux.source).collect(),
      prefetch,
      delay_error,
    ))
  }

  /// Merges this sequence with another.
  #[must_use]
  pub fn merge_with(self, other: Self) -> Self {
    Self::merge(alloc::vec![self, other])
  }

  /// Pairs values of two sequences positionally.
  #[must_use]
  pub fn zip_with<U, R, F>(self, other: Flux<U>, combiner: F) -> Flux<R>
  where
    U: Send + 'static,
    R: Send + 'static,
    F: Fn(T, U) -> R + Send + Sync + 'static, {
    Flux::from_operator(ZipPublisher::new(
      self.source,
      other.source,
      Arc::new(combiner),
      StreamConfig::new().small_prefetch(),
    ))
  }

  /// Zips any number of same-typed sequences into row vectors.
  #[must_use]
  pub fn zip_all(sources: Vec<Self>) -> Flux<Vec<T>> {
    Flux::from_operator(ZipAllPublisher::new(
      sources.into_iter().map(|flux| flux.source).collect(),
      StreamConfig::new().small_prefetch(),
    ))
  }

  /// Combines the latest values of two sequences on every change.
  #[must_use]
  pub fn combine_latest<U, R, F>(self, other: Flux<U>, combiner: F) -> Flux<R>
  where
    T: Clone + Sync,
    U: Clone + Send + Sync + 'static,
    R: Send + 'static,
    F: Fn(&T, &U) -> R + Send + Sync + 'static, {
    Flux::from_operator(CombineLatestPublisher::new(self.source, other.source, Arc::new(combiner)))
  }

  /// Combines the latest values of any number of same-typed sequences.
  #[must_use]
  pub fn combine_latest_all<R, F>(sources: Vec<Self>, combiner: F) -> Flux<R>
  where
    T: Clone + Sync,
    R: Send + 'static,
    F: Fn(&[T]) -> R + Send + Sync + 'static, {
    Flux::from_operator(CombineLatestAllPublisher::new(
      sources.into_iter().map(|flux| flux.source).collect(),
      Arc::new(combiner),
    ))
  }

  /// Switches to the sequence derived from each value, cancelling the
  /// previous derived sequence.
  #[must_use]
  pub fn switch_map<R, F>(self, mapper: F) -> Flux<R>
  where
    R: Send + 'static,
    F: Fn(T) -> Flux<R> + Send + Sync + 'static, {
    Flux::from_operator(SwitchMapPublisher::new(self.source, Arc::new(mapper)))
  }

  /// Mirrors whichever source signals first; the others are cancelled.
  #[must_use]
  pub fn race(sources: Vec<Self>) -> Self {
    Self::from_operator(RacePublisher::new(sources.into_iter().map(|flux| flux.source).collect()))
  }

  /// Races this sequence against another.
  #[must_use]
  pub fn race_with(self, other: Self) -> Self {
    Self::race(alloc::vec![self, other])
  }

  /// Hands the first signal and the remaining sequence to a transform
  /// choosing the outbound sequence.
  ///
  /// The remainder may be subscribed at most once; terminal-only
  /// sequences hand the transform their terminal signal instead of a
  /// value.
  #[must_use]
  pub fn switch_on_first<R, F>(self, transform: F, cancel_source_on_complete: bool) -> Flux<R>
  where
    R: Send + 'static,
    F: Fn(Signal<T>, Self) -> Flux<R> + Send + Sync + 'static, {
    Flux::from_operator(SwitchOnFirstPublisher::new(self.source, Arc::new(transform), cancel_source_on_complete))
  }

  /// Multicasts this sequence inside the selector scope: the selector
  /// may subscribe the shared view several times while upstream is
  /// subscribed only once.
  #[must_use]
  pub fn publish_with<R, F>(self, selector: F) -> Flux<R>
  where
    T: Clone + Sync,
    R: Send + 'static,
    F: Fn(Self) -> Flux<R> + Send + Sync + 'static, {
    Flux::from_operator(PublishMulticastPublisher::new(
      self.source,
      Arc::new(selector),
      StreamConfig::new().default_prefetch(),
    ))
  }

  /// Resubscribes up to `attempts` times after a failure.
  #[must_use]
  pub fn retry(self, attempts: u64) -> Self {
    Self::from_operator(RetryPublisher::new(self.source, attempts, None))
  }

  /// Resubscribes after failures matching the predicate, up to
  /// `attempts` times.
  #[must_use]
  pub fn retry_when<F>(self, attempts: u64, predicate: F) -> Self
  where
    F: Fn(&StreamError) -> bool + Send + Sync + 'static, {
    Self::from_operator(RetryPublisher::new(self.source, attempts, Some(Arc::new(predicate))))
  }

  /// Resubscribes after completion, replaying the sequence `times`
  /// additional times.
  #[must_use]
  pub fn repeat(self, times: u64) -> Self {
    Self::from_operator(RepeatPublisher::new(self.source, times))
  }

  /// Fails with a timeout error when the gap between signals exceeds
  /// the window.
  #[must_use]
  pub fn timeout(self, window: Duration, scheduler: Arc<dyn Scheduler>) -> Self {
    Self::from_operator(TimeoutPublisher::new(self.source, window, scheduler, None))
  }

  /// Switches to a fallback sequence when the gap between signals
  /// exceeds the window.
  #[must_use]
  pub fn timeout_or(self, window: Duration, scheduler: Arc<dyn Scheduler>, fallback: Self) -> Self {
    Self::from_operator(TimeoutPublisher::new(self.source, window, scheduler, Some(fallback.source)))
  }

  /// Switches to a recovery sequence chosen from the error.
  #[must_use]
  pub fn on_error_resume<F>(self, fallback: F) -> Self
  where
    F: Fn(&StreamError) -> Self + Send + Sync + 'static, {
    Self::from_operator(OnErrorResumePublisher::new(self.source, Arc::new(fallback)))
  }

  /// Replaces a failure with one final value.
  #[must_use]
  pub fn on_error_return(self, value: T) -> Self
  where
    T: Clone + Sync, {
    self.on_error_resume(move |_| Self::just(value.clone()))
  }

  /// Derives the sequence from an asynchronously acquired resource and
  /// runs the matching asynchronous cleanup after the terminal.
  ///
  /// The main terminal is deferred until the cleanup sequence
  /// terminates; a cleanup failure is combined with the main error.
  #[must_use]
  pub fn using_when<R, FC, FK, FE, FX>(
    resource: Mono<R>,
    closure: FC,
    on_complete: FK,
    on_error: FE,
    on_cancel: FX,
  ) -> Self
  where
    R: Send + Sync + 'static,
    FC: Fn(&Arc<R>) -> Self + Send + Sync + 'static,
    FK: Fn(&Arc<R>) -> Mono<()> + Send + Sync + 'static,
    FE: Fn(&Arc<R>, &StreamError) -> Mono<()> + Send + Sync + 'static,
    FX: Fn(&Arc<R>) -> Mono<()> + Send + Sync + 'static, {
    Self::from_operator(UsingWhenPublisher::new(
      resource.raw_source(),
      Arc::new(closure),
      Arc::new(on_complete),
      Arc::new(on_error),
      Arc::new(on_cancel),
    ))
  }
}

impl Flux<u64> {
  /// Emits `count` consecutive integers starting at `start`.
  #[must_use]
  pub fn range(start: u64, count: u64) -> Self {
    Self::from_operator(RangePublisher::new(start, count))
  }

  /// Emits sequential ticks on the scheduler clock, the first after
  /// one period.
  #[must_use]
  pub fn interval(period: Duration, scheduler: Arc<dyn Scheduler>) -> Self {
    Self::interval_with_delay(period, period, scheduler)
  }

  /// Emits sequential ticks, the first after `initial_delay`.
  #[must_use]
  pub fn interval_with_delay(initial_delay: Duration, period: Duration, scheduler: Arc<dyn Scheduler>) -> Self {
    Self::from_operator(IntervalPublisher::new(initial_delay, period, scheduler))
  }
}
