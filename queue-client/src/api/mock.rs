//! Mock lead API for testing.
//!
//! Records every request, returns queued outcomes in order, and can hold
//! requests at a gate so tests can observe an attempt while it is in flight.

use super::{LeadApi, RemoteError};
use async_trait::async_trait;
use queue_types::{CreateLeadRequest, RemoteId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Mock lead API.
///
/// Clones share state. Without queued outcomes every request succeeds with
/// a generated id (`mock-1`, `mock-2`, ...).
#[derive(Debug, Clone)]
pub struct MockLeadApi {
    inner: Arc<Mutex<MockInner>>,
    /// `true` while requests are held.
    paused: Arc<watch::Sender<bool>>,
}

#[derive(Debug)]
struct MockInner {
    requests: Vec<CreateLeadRequest>,
    outcomes: VecDeque<Result<RemoteId, RemoteError>>,
    reachable: bool,
    probe_count: usize,
}

impl Default for MockInner {
    fn default() -> Self {
        Self {
            requests: Vec::new(),
            outcomes: VecDeque::new(),
            reachable: true,
            probe_count: 0,
        }
    }
}

impl Default for MockLeadApi {
    fn default() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            inner: Arc::default(),
            paused: Arc::new(paused),
        }
    }
}

impl MockLeadApi {
    /// Create a new mock API.
    pub fn new() -> Self {
        Self::default()
    }

    /// The next unanswered request succeeds with this id.
    pub fn queue_success(&self, remote_id: &str) {
        self.lock().outcomes.push_back(Ok(RemoteId::new(remote_id)));
    }

    /// The next unanswered request fails with this error.
    pub fn queue_failure(&self, error: RemoteError) {
        self.lock().outcomes.push_back(Err(error));
    }

    /// All requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<CreateLeadRequest> {
        self.lock().requests.clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Make `probe()` succeed or fail.
    pub fn set_reachable(&self, reachable: bool) {
        self.lock().reachable = reachable;
    }

    /// Number of probes received so far.
    pub fn probe_count(&self) -> usize {
        self.lock().probe_count
    }

    /// Hold requests after they are recorded until `resume()`.
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    /// Release held requests.
    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Clear recorded requests and queued outcomes.
    pub fn reset(&self) {
        *self.lock() = MockInner::default();
        self.resume();
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LeadApi for MockLeadApi {
    async fn create_lead(&self, request: &CreateLeadRequest) -> Result<RemoteId, RemoteError> {
        let count = {
            let mut inner = self.lock();
            inner.requests.push(request.clone());
            inner.requests.len()
        };

        let mut gate = self.paused.subscribe();
        // The sender lives as long as self, so this cannot fail
        let _ = gate.wait_for(|paused| !*paused).await;

        let queued = self.lock().outcomes.pop_front();
        queued.unwrap_or_else(|| Ok(RemoteId::new(format!("mock-{count}"))))
    }

    async fn probe(&self) -> Result<(), RemoteError> {
        let mut inner = self.lock();
        inner.probe_count += 1;
        if inner.reachable {
            Ok(())
        } else {
            Err(RemoteError::Network("unreachable".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queue_types::{CustomerRef, Draft, DraftInput, LineItem, Timestamp};
    use std::time::Duration;

    fn request() -> CreateLeadRequest {
        let draft = Draft::new(
            DraftInput::new(CustomerRef::remote("c-1")).with_item(LineItem::new("X", 1, 1.0)),
            Timestamp::from_millis(1),
        );
        CreateLeadRequest::from_draft(&draft)
    }

    #[tokio::test]
    async fn default_outcome_is_generated_id() {
        let api = MockLeadApi::new();

        assert_eq!(api.create_lead(&request()).await.unwrap().as_str(), "mock-1");
        assert_eq!(api.create_lead(&request()).await.unwrap().as_str(), "mock-2");
        assert_eq!(api.request_count(), 2);
    }

    #[tokio::test]
    async fn queued_outcomes_in_order() {
        let api = MockLeadApi::new();
        api.queue_success("555");
        api.queue_failure(RemoteError::Timeout);

        assert_eq!(api.create_lead(&request()).await.unwrap().as_str(), "555");
        assert_eq!(
            api.create_lead(&request()).await.unwrap_err(),
            RemoteError::Timeout
        );
    }

    #[tokio::test]
    async fn records_requests() {
        let api = MockLeadApi::new();
        let req = request();

        api.create_lead(&req).await.unwrap();

        assert_eq!(api.requests(), vec![req]);
    }

    #[tokio::test]
    async fn probe_follows_reachability() {
        let api = MockLeadApi::new();
        assert!(api.probe().await.is_ok());

        api.set_reachable(false);
        assert!(api.probe().await.is_err());
        assert_eq!(api.probe_count(), 2);
    }

    #[tokio::test]
    async fn pause_holds_requests_until_resume() {
        let api = MockLeadApi::new();
        api.pause();

        let handle = tokio::spawn({
            let api = api.clone();
            async move { api.create_lead(&request()).await }
        });

        // Recorded but not answered
        while api.request_count() == 0 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());

        api.resume();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn reset_clears_state() {
        let api = MockLeadApi::new();
        api.queue_failure(RemoteError::Timeout);
        api.create_lead(&request()).await.unwrap_err();

        api.reset();

        assert_eq!(api.request_count(), 0);
        assert!(api.create_lead(&request()).await.is_ok());
    }
}
