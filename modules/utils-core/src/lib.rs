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

//! Core utility primitives for the runnel workspace.
//!
//! Hosts the single-producer/single-consumer queue family the stream
//! operators stage elements through, plus the cache-padding helper the
//! queue indices rely on. Everything here is `no_std` + `alloc`.

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod collections;
pub mod sync;
