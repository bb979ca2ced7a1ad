//! The reactive protocol core: contracts, helper bundle, and the
//! `Flux`/`Mono` operator surface.

/// Introspection attributes for operator state machines.
mod attr;
/// Immutable subscription context map.
mod context;
/// Deferred-subscription state mixin.
mod deferred_subscription;
/// Disposable resource handle.
mod disposable;
/// Multi-valued pipeline handle and operator constructors.
mod flux;
/// Operator fusion modes.
mod fusion;
/// Hook table and drop/discard dispatch.
mod hooks;
/// Closure-backed terminal subscriber.
mod lambda_subscriber;
/// At-most-one-value pipeline handle and operator constructors.
mod mono;
/// Operator state machines.
mod operator;
/// Publisher contract.
mod publisher;
/// Single-value subscription with sync fusion.
mod scalar_subscription;
/// Executor abstraction consumed by time-based operators.
mod scheduler;
/// Rule-1.3 serializing subscriber decorator.
mod serialized_subscriber;
/// Materialized signal variants.
mod signal;
/// Ambient tuning knobs.
mod stream_config;
/// Error taxonomy of the protocol.
mod stream_error;
/// Subscriber contract.
mod subscriber;
/// Subscription contract with the fusion surface.
mod subscription;
/// Multi-upstream subscription switching mixin.
mod subscription_arbiter;
/// Demand arithmetic, validation, and terminal shortcuts.
mod support;
/// Single-subscriber processor with an unbounded queue.
mod unicast_sink;
/// Cloneable carrier for user-supplied errors.
mod user_error;

/// Protocol probes for tests: demand-aware sinks, scripted publishers,
/// and a hand-driven scheduler.
pub mod testing;

pub use attr::{Attr, AttrValue, Scannable};
pub use context::Context;
pub use deferred_subscription::DeferredSubscription;
pub use disposable::Disposable;
pub use flux::{FinallyKind, Flux};
pub use fusion::FusionMode;
pub use hooks::{
  context_with_discard_hook, context_with_error_dropped_hook, context_with_next_dropped_hook, on_discard,
  on_discard_all, on_error_dropped, on_next_dropped, on_operator_error, reset_all_hooks, reset_on_discard,
  reset_on_error_dropped, reset_on_next_dropped, set_on_discard, set_on_error_dropped, set_on_next_dropped,
  DroppedValue, ErrorHook, ValueHook,
};
pub use lambda_subscriber::LambdaSubscriber;
pub use mono::Mono;
pub use publisher::Publisher;
pub use scalar_subscription::ScalarSubscription;
pub use scheduler::{PeriodicTask, Scheduler, SchedulerError, Task, TaskHandle};
pub use serialized_subscriber::SerializedSubscriber;
pub use signal::Signal;
pub use stream_config::StreamConfig;
pub use stream_error::StreamError;
pub use subscriber::CoreSubscriber;
pub use subscription::Subscription;
pub use subscription_arbiter::SubscriptionArbiter;
pub use support::{add_cap, add_cap_atomic, complete_only, error_only, produced, sub_or_zero, validate_demand, EmptySubscription};
pub use unicast_sink::UnicastSink;
pub use user_error::UserError;
