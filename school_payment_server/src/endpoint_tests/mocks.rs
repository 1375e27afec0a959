use gateway_tools::{
    CollectionRequestResponse,
    CollectionStatusResponse,
    GatewayApiError,
    PaymentGateway,
    SignedCollectionRequest,
    StatusQuery,
};
use mockall::mock;

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn create_collection_request(
            &self,
            request: &SignedCollectionRequest,
        ) -> Result<CollectionRequestResponse, GatewayApiError>;
        async fn query_status(&self, query: &StatusQuery) -> Result<CollectionStatusResponse, GatewayApiError>;
    }
}

pub fn collect_response(id: &str) -> CollectionRequestResponse {
    CollectionRequestResponse {
        collect_request_id: id.to_string(),
        collect_request_url: format!("https://pay.example.com/collect/{id}"),
    }
}

pub fn status_response(status: &str) -> CollectionStatusResponse {
    CollectionStatusResponse { status: status.to_string(), ..Default::default() }
}
