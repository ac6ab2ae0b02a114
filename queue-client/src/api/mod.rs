//! Remote lead API abstraction.
//!
//! The coordinator talks to the server through [`LeadApi`], which has two
//! calls:
//! - `create_lead()` submits one draft and returns the server-assigned id
//! - `probe()` is a lightweight reachability check against the same host
//!
//! Failures come back as [`RemoteError`]. They are expected and retryable,
//! and the coordinator records them on the draft instead of propagating.
//!
//! # Example
//!
//! ```ignore
//! let api = MockLeadApi::new();
//! api.queue_success("555");
//! let remote_id = api.create_lead(&request).await?;
//! ```

mod http;
mod mock;

pub use http::HttpLeadApi;
pub use mock::MockLeadApi;

use async_trait::async_trait;
use queue_types::{CreateLeadRequest, RemoteId};
use thiserror::Error;

/// Remote API errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The request never reached the server.
    #[error("network error: {0}")]
    Network(String),

    /// The server did not answer in time.
    #[error("request timed out")]
    Timeout,

    /// The server refused the payload (4xx).
    #[error("rejected by server ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Server-provided message.
        message: String,
    },

    /// The server failed (5xx).
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server-provided message.
        message: String,
    },

    /// A success response that could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Whether the failure says anything about reachability.
    ///
    /// Rejections prove the server is up; everything else might not.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, RemoteError::Network(_) | RemoteError::Timeout)
    }
}

/// The remote create-lead endpoint.
///
/// Implementations must be safe to call from spawned tasks.
#[async_trait]
pub trait LeadApi: Send + Sync + 'static {
    /// Submit a draft. Returns the remote identifier on success.
    async fn create_lead(&self, request: &CreateLeadRequest) -> Result<RemoteId, RemoteError>;

    /// Check whether the API host is reachable.
    async fn probe(&self) -> Result<(), RemoteError>;
}

#[async_trait]
impl<T: LeadApi + ?Sized> LeadApi for std::sync::Arc<T> {
    async fn create_lead(&self, request: &CreateLeadRequest) -> Result<RemoteId, RemoteError> {
        (**self).create_lead(request).await
    }

    async fn probe(&self) -> Result<(), RemoteError> {
        (**self).probe().await
    }
}
