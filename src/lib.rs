#![no_std]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_safety_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::print_stdout)]
#![deny(clippy::dbg_macro)]

//! Entry point crate for the runnel reactive-streams workspace.
//!
//! This facade re-exports the protocol core and operator surface of
//! [`runnel_streams_rs`] together with the queue primitives of
//! [`runnel_utils_core_rs`], so downstream users depend on a single
//! crate. Feature flags map one-to-one onto the member crates: enabling
//! `std` turns on the tokio scheduler and tracing-backed default hooks.

pub use runnel_streams_rs as streams;
pub use runnel_utils_core_rs as utils;

pub use runnel_streams_rs::reactive::{Context, Flux, FusionMode, Mono, Signal, StreamError};
