use alloc::{string::String, vec};

use crate::reactive::{testing::{TestPublisher, TestSubscriber}, Flux, Signal, StreamError};

#[test]
fn first_signal_reaches_the_transform_and_remainder_follows() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_vec(vec![String::from("A"), String::from("B"), String::from("C")])
    .switch_on_first(
      |signal, remainder| {
        let lead = signal.value().map(|value| value.to_lowercase()).unwrap_or_default();
        Flux::concat(vec![Flux::just(lead), remainder])
      },
      true,
    )
    .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [String::from("a"), String::from("B"), String::from("C")]);
  assert!(probe.is_completed());
}

#[test]
fn empty_sources_hand_the_transform_their_terminal() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::<u32>::empty()
    .switch_on_first(
      |signal, _remainder| match signal {
        | Signal::Complete => Flux::just(99),
        | _ => Flux::empty(),
      },
      true,
    )
    .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [99]);
  assert!(probe.is_completed());
}

#[test]
fn failing_sources_hand_the_transform_the_error() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::<u32>::error(StreamError::message("boom"))
    .switch_on_first(
      |signal, _remainder| match signal {
        | Signal::Error(_) => Flux::just(1),
        | _ => Flux::empty(),
      },
      true,
    )
    .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [1]);
  assert!(probe.is_completed());
}

#[test]
fn the_remainder_allows_only_one_subscriber() {
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_vec(vec![1_u32, 2])
    .switch_on_first(
      |_, remainder| {
        let extra = TestSubscriber::<u32>::with_demand(1);
        remainder.clone().subscribe_with(extra.clone());
        assert!(extra.error().is_none());
        let second = TestSubscriber::<u32>::with_demand(1);
        remainder.clone().subscribe_with(second.clone());
        assert!(matches!(second.error(), Some(StreamError::InnerAlreadySubscribed)));
        Flux::just(0)
      },
      true,
    )
    .subscribe_with(probe.clone());
  assert_eq!(probe.received(), [0]);
}

#[test]
fn ignoring_the_remainder_cancels_the_source() {
  let source = TestPublisher::<u32>::new();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone())
    .switch_on_first(|_, _remainder| Flux::just(5), false)
    .subscribe_with(probe.clone());
  source.emit(1);
  assert_eq!(probe.received(), [5]);
  assert!(probe.is_completed());
  // The remainder was never subscribed: the inbound must not leak.
  assert!(source.is_cancelled());
}

#[test]
fn outbound_cancel_errors_a_live_remainder() {
  let source = TestPublisher::<u32>::new();
  let inner_probe = TestSubscriber::<u32>::with_demand(u64::MAX);
  let inner_handle = inner_probe.clone();
  let probe = TestSubscriber::with_demand(u64::MAX);
  Flux::from_publisher(source.clone())
    .switch_on_first(
      move |_, remainder| {
        remainder.subscribe_with(inner_handle.clone());
        Flux::from_publisher(TestPublisher::<u32>::new())
      },
      true,
    )
    .subscribe_with(probe.clone());
  source.emit(1);
  probe.cancel();
  assert!(source.is_cancelled());
  assert!(matches!(inner_probe.error(), Some(StreamError::Cancelled)));
}

#[test]
fn late_terminals_replay_to_a_late_inner_subscriber() {
  let source = TestPublisher::<u32>::new();
  let outbound = TestPublisher::<u32>::new();
  let outbound_flux = Flux::from_publisher(outbound.clone());
  let probe = TestSubscriber::with_demand(u64::MAX);
  let stash = alloc::sync::Arc::new(spin::Mutex::new(None));
  let keeper = stash.clone();
  Flux::from_publisher(source.clone())
    .switch_on_first(
      move |_, remainder| {
        *keeper.lock() = Some(remainder);
        outbound_flux.clone()
      },
      false,
    )
    .subscribe_with(probe.clone());
  source.emit(1);
  // The terminal arrives while nobody listens to the remainder yet.
  source.complete();
  let remainder = stash.lock().take().expect("remainder");
  let inner = TestSubscriber::<u32>::with_demand(u64::MAX);
  remainder.subscribe_with(inner.clone());
  assert!(inner.is_completed());
  outbound.complete();
  assert!(probe.is_completed());
}
