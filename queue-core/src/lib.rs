//! # queue-core
//!
//! Pure logic for the leadq offline lead queue (no I/O, instant tests).
//!
//! This crate implements the state machines and algorithms for draft
//! synchronization without any network or disk I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. Time is passed in by the caller, never read from a
//! clock, so every transition is deterministic.
//!
//! The actual I/O (remote API, draft storage, connectivity probes) is
//! performed by `queue-client`, which drives these state machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod debounce;
pub mod lifecycle;
pub mod schedule;
pub mod validate;

pub use clock::CreationClock;
pub use debounce::{Connectivity, ConnectivitySignal};
pub use lifecycle::{DraftEvent, TransitionError};
pub use schedule::{pending_count, sync_order};
pub use validate::validate_input;
