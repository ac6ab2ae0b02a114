//! # queue-types
//!
//! Data types for the leadq offline lead queue.
//!
//! This crate provides the foundational types used across all leadq crates:
//! - [`DraftId`], [`RemoteId`], [`Timestamp`] - Identity and ordering types
//! - [`Draft`], [`SyncState`] - The persisted draft record and its sync status
//! - [`CreateLeadRequest`], [`CreateLeadResponse`] - Remote API payloads
//! - [`ValidationError`] - Input validation failures

#![warn(missing_docs)]
#![warn(clippy::all)]

mod draft;
mod error;
mod ids;
mod messages;

pub use draft::{CustomerRef, Draft, DraftInput, LineItem, SyncState};
pub use error::ValidationError;
pub use ids::{DraftId, RemoteId, Timestamp};
pub use messages::{CreateLeadRequest, CreateLeadResponse, ErrorBody};
