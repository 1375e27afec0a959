//! Deterministic stand-ins for the engine's outside collaborators.
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, Utc};
use gateway_tools::{
    CollectionRequestResponse,
    CollectionStatusResponse,
    GatewayApiError,
    PaymentGateway,
    SignedCollectionRequest,
    StatusQuery,
};

use crate::traits::Clock;

#[derive(Default)]
struct FakeGatewayState {
    collection_responses: VecDeque<Result<CollectionRequestResponse, GatewayApiError>>,
    status_responses: VecDeque<Result<CollectionStatusResponse, GatewayApiError>>,
    collection_requests: Vec<SignedCollectionRequest>,
    status_queries: Vec<StatusQuery>,
}

/// A scripted payment gateway.
///
/// Queued responses are handed out in order. Once the collection queue is empty, every collection request succeeds
/// with a made-up id and URL. Status queries fail with [`GatewayApiError::InvalidResponse`] when nothing is queued.
/// Clones share their script and call history.
#[derive(Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<FakeGatewayState>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_collection_response(&self, response: Result<CollectionRequestResponse, GatewayApiError>) {
        self.state.lock().expect("poisoned").collection_responses.push_back(response);
    }

    pub fn push_status_response(&self, response: Result<CollectionStatusResponse, GatewayApiError>) {
        self.state.lock().expect("poisoned").status_responses.push_back(response);
    }

    /// Convenience for queuing a successful status query result.
    pub fn push_status(&self, status: &str) {
        let response = CollectionStatusResponse { status: status.to_string(), ..Default::default() };
        self.push_status_response(Ok(response));
    }

    pub fn collection_requests(&self) -> Vec<SignedCollectionRequest> {
        self.state.lock().expect("poisoned").collection_requests.clone()
    }

    pub fn status_queries(&self) -> Vec<StatusQuery> {
        self.state.lock().expect("poisoned").status_queries.clone()
    }
}

impl PaymentGateway for FakeGateway {
    async fn create_collection_request(
        &self,
        request: &SignedCollectionRequest,
    ) -> Result<CollectionRequestResponse, GatewayApiError> {
        let mut state = self.state.lock().expect("poisoned");
        state.collection_requests.push(request.clone());
        let n = state.collection_requests.len();
        state.collection_responses.pop_front().unwrap_or_else(|| {
            Ok(CollectionRequestResponse {
                collect_request_id: format!("CR_{n:04}"),
                collect_request_url: format!("https://pay.example.com/collect/CR_{n:04}"),
            })
        })
    }

    async fn query_status(&self, query: &StatusQuery) -> Result<CollectionStatusResponse, GatewayApiError> {
        let mut state = self.state.lock().expect("poisoned");
        state.status_queries.push(query.clone());
        state
            .status_responses
            .pop_front()
            .unwrap_or_else(|| Err(GatewayApiError::InvalidResponse("no status response scripted".into())))
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("poisoned") = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("poisoned");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("poisoned")
    }
}
