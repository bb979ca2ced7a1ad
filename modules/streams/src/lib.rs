#![no_std]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![deny(clippy::missing_safety_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::print_stdout)]
#![deny(clippy::dbg_macro)]

//! Reactive-streams protocol core and operator algebra.
//!
//! The crate provides two pipeline shapes, [`reactive::Flux`] (zero or
//! more values) and [`reactive::Mono`] (at most one value), a strict
//! rendition of the subscription/signal protocol they ride on, and the
//! operator state machines that compose them. Operators are
//! callback-driven: demand flows sink to source through
//! [`reactive::Subscription::request`], values flow source to sink
//! through [`reactive::CoreSubscriber::on_next`], and serialization is
//! achieved with work-in-progress drain loops rather than executor
//! suspension.
//!
//! The `std` feature adds the tokio-backed `runtime::TokioScheduler`
//! and tracing-backed default hooks; everything else is `no_std` +
//! `alloc`.

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod reactive;
#[cfg(feature = "std")]
pub mod runtime;
