use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::GatewayConfig,
    data_objects::{CollectionRequestResponse, CollectionStatusResponse, SignedCollectionRequest, StatusQuery},
    GatewayApiError,
};

/// The two gateway calls the payment engine relies on.
///
/// Implementations must not retry. Every failure, including timeouts and non-2xx responses, is surfaced as a
/// [`GatewayApiError`].
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    async fn create_collection_request(
        &self,
        request: &SignedCollectionRequest,
    ) -> Result<CollectionRequestResponse, GatewayApiError>;

    async fn query_status(&self, query: &StatusQuery) -> Result<CollectionStatusResponse, GatewayApiError>;
}

#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(format!("Bearer {}", config.api_key.reveal()).as_str())
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, GatewayApiError> {
        let url = self.url(path);
        trace!("📡️ Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        if status.is_success() {
            trace!("📡️ REST query successful. {status}");
            serde_json::from_str::<T>(&text).map_err(|e| GatewayApiError::JsonError(format!("{e}. Body: {text}")))
        } else {
            Err(GatewayApiError::QueryError { status: status.as_u16(), message: text })
        }
    }
}

fn transport_error(e: reqwest::Error) -> GatewayApiError {
    if e.is_timeout() {
        GatewayApiError::Timeout
    } else {
        GatewayApiError::NetworkError(e.to_string())
    }
}

impl PaymentGateway for GatewayApi {
    async fn create_collection_request(
        &self,
        request: &SignedCollectionRequest,
    ) -> Result<CollectionRequestResponse, GatewayApiError> {
        debug!("📡️ Requesting collection of {} for school {}", request.request.amount, request.request.school_id);
        let result = self
            .rest_query::<CollectionRequestResponse, _>(Method::POST, "/create-collect-request", &[], Some(request))
            .await?;
        if result.collect_request_url.trim().is_empty() {
            return Err(GatewayApiError::InvalidResponse("collection request has no payment URL".into()));
        }
        info!("📡️ Gateway created collection request {}", result.collect_request_id);
        Ok(result)
    }

    async fn query_status(&self, query: &StatusQuery) -> Result<CollectionStatusResponse, GatewayApiError> {
        let path = format!("/collect-request/{}", query.collect_request_id);
        debug!("📡️ Querying gateway status of {}", query.collect_request_id);
        let params = [("school_id", query.school_id.as_str()), ("sign", query.sign.as_str())];
        let result = self.rest_query::<CollectionStatusResponse, ()>(Method::GET, &path, &params, None).await?;
        debug!("📡️ Gateway reports {} for {}", result.status, query.collect_request_id);
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use httpmock::prelude::*;
    use serde_json::json;
    use spg_common::{Amount, Secret};

    use super::*;
    use crate::{CollectionRequest, RequestSigner};

    fn api_for(server: &MockServer) -> GatewayApi {
        let config = GatewayConfig {
            api_url: server.base_url(),
            api_key: Secret::from("api-key-1"),
            pg_key: Secret::from("edvtest01"),
            ..Default::default()
        };
        GatewayApi::new(config).unwrap()
    }

    fn signed_request() -> SignedCollectionRequest {
        let signer = RequestSigner::new(Secret::from("edvtest01")).unwrap();
        let request = CollectionRequest::new("school-1", Amount::from_major(1000), "https://cb.example/return");
        signer.sign_collection_request(request).unwrap()
    }

    #[tokio::test]
    async fn create_collection_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/create-collect-request")
                    .header("Authorization", "Bearer api-key-1")
                    .json_body_partial(r#"{"school_id":"school-1","amount":1000}"#);
                then.status(200).json_body(json!({
                    "collect_request_id": "6808bc4888e4e3c149e757f1",
                    "Collect_request_url": "https://pay.example/6808bc4888e4e3c149e757f1"
                }));
            })
            .await;
        let api = api_for(&server);
        let result = api.create_collection_request(&signed_request()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(result.collect_request_id, "6808bc4888e4e3c149e757f1");
        assert_eq!(result.collect_request_url, "https://pay.example/6808bc4888e4e3c149e757f1");
    }

    #[tokio::test]
    async fn non_2xx_is_a_typed_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/create-collect-request");
                then.status(503).body("maintenance");
            })
            .await;
        let err = api_for(&server).create_collection_request(&signed_request()).await.unwrap_err();
        assert!(matches!(err, GatewayApiError::QueryError { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn missing_payment_url_is_not_success() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/create-collect-request");
                then.status(200).json_body(json!({"collect_request_id": "abc", "collect_request_url": ""}));
            })
            .await;
        let err = api_for(&server).create_collection_request(&signed_request()).await.unwrap_err();
        assert!(matches!(err, GatewayApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn slow_gateway_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collect-request/abc");
                then.status(200).delay(Duration::from_millis(1500)).json_body(json!({"status": "SUCCESS"}));
            })
            .await;
        let config = GatewayConfig { api_url: server.base_url(), pg_key: Secret::from("k"), ..Default::default() }
            .with_timeout(Duration::from_millis(200));
        let api = GatewayApi::new(config).unwrap();
        let query = StatusQuery { collect_request_id: "abc".into(), school_id: "school-1".into(), sign: "s".into() };
        let err = api.query_status(&query).await.unwrap_err();
        assert!(matches!(err, GatewayApiError::Timeout));
    }

    #[tokio::test]
    async fn query_status() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/collect-request/6808bc4888e4e3c149e757f1")
                    .query_param("school_id", "school-1")
                    .query_param_exists("sign")
                    .header("Authorization", "Bearer api-key-1");
                then.status(200).json_body(json!({
                    "status": "SUCCESS",
                    "amount": 1000,
                    "transaction_amount": 1002.5,
                    "payment_mode": "upi",
                    "bank_reference": "YESBNK222"
                }));
            })
            .await;
        let signer = RequestSigner::new(Secret::from("edvtest01")).unwrap();
        let query = signer.sign_status_query("6808bc4888e4e3c149e757f1", "school-1").unwrap();
        let result = api_for(&server).query_status(&query).await.unwrap();
        mock.assert_async().await;
        assert_eq!(result.status, "SUCCESS");
        assert_eq!(result.transaction_amount, Some(Amount::from(100_250)));
        assert_eq!(result.bank_reference.as_deref(), Some("YESBNK222"));
        assert!(result.message.is_none());
    }
}
