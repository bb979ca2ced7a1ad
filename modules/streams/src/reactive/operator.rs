//! Operator state machines.
//!
//! One module per operator: the publisher node users assemble plus the
//! per-subscription subscriber it installs.

pub(crate) mod buffer_count;
pub(crate) mod buffer_when;
pub(crate) mod combine_latest;
pub(crate) mod concat;
pub(crate) mod default_if_empty;
pub(crate) mod defer;
pub(crate) mod distinct;
pub(crate) mod do_finally;
pub(crate) mod empty;
pub(crate) mod error_source;
pub(crate) mod filter;
pub(crate) mod from_fn;
pub(crate) mod from_iter;
pub(crate) mod from_vec;
pub(crate) mod hide;
pub(crate) mod ignore_elements;
pub(crate) mod interval;
pub(crate) mod just;
pub(crate) mod map;
pub(crate) mod merge;
pub(crate) mod on_error_resume;
pub(crate) mod peek;
pub(crate) mod publish_multicast;
pub(crate) mod race;
pub(crate) mod range;
pub(crate) mod repeat;
pub(crate) mod retry;
pub(crate) mod sample;
pub(crate) mod scan;
pub(crate) mod skip;
pub(crate) mod skip_while;
pub(crate) mod switch_map;
pub(crate) mod switch_on_first;
pub(crate) mod take;
pub(crate) mod take_while;
pub(crate) mod then;
pub(crate) mod timeout;
pub(crate) mod try_map;
pub(crate) mod using_when;
pub(crate) mod window_count;
pub(crate) mod window_when;
pub(crate) mod zip;
