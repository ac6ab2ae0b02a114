//! HTTP implementation of the lead API.
//!
//! `POST {leads_url}` with the JSON request body and an `Idempotency-Key`
//! header carrying the draft id. `GET {health_url}` for probes: any answer
//! below 500 means the host is reachable.

use async_trait::async_trait;
use queue_types::{CreateLeadRequest, CreateLeadResponse, ErrorBody, RemoteId};

use super::{LeadApi, RemoteError};
use crate::config::ApiConfig;

/// Header carrying the client-generated draft id.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Lead API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLeadApi {
    http: reqwest::Client,
    leads_url: String,
    health_url: String,
}

impl HttpLeadApi {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Network` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            leads_url: config.leads_url(),
            health_url: config.health_url(),
        })
    }
}

#[async_trait]
impl LeadApi for HttpLeadApi {
    async fn create_lead(&self, request: &CreateLeadRequest) -> Result<RemoteId, RemoteError> {
        let response = self
            .http
            .post(&self.leads_url)
            .header(IDEMPOTENCY_HEADER, request.client_reference.to_string())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &body));
        }

        let body = response.text().await?;
        let parsed: CreateLeadResponse = serde_json::from_str(&body)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        Ok(parsed.id)
    }

    async fn probe(&self) -> Result<(), RemoteError> {
        let response = self.http.get(&self.health_url).send().await?;
        let status = response.status().as_u16();
        if status >= 500 {
            return Err(RemoteError::Server {
                status,
                message: "health check failed".to_string(),
            });
        }
        Ok(())
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::Timeout
        } else {
            RemoteError::Network(e.to_string())
        }
    }
}

/// Map a non-success status and body to an error.
///
/// Uses the structured `{"message": ...}` body when present, the raw body
/// otherwise.
fn classify_failure(status: u16, body: &str) -> RemoteError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    if (400..500).contains(&status) {
        RemoteError::Rejected { status, message }
    } else {
        RemoteError::Server { status, message }
    }
}
