use std::{fmt::Debug, sync::Arc};

use gateway_tools::{
    CollectionRequest,
    CollectionRequestResponse,
    GatewayApiError,
    PaymentGateway,
    RequestSigner,
    SignedCollectionRequest,
};
use log::*;

use crate::{
    db_types::{Order, OrderId, OrderStatus},
    helpers::{new_order_id, RetryPolicy},
    order_objects::{CreatedPayment, NewPaymentRequest},
    spe_api::errors::PaymentEngineError,
    traits::{Clock, OrderManagement, SystemClock},
};

/// `OrderFlowApi` creates new orders and hands them to the payment gateway.
///
/// The order and its initial status are persisted before the gateway is contacted. If the gateway then cannot be
/// reached, the order stays in the store as `pending` and the caller receives
/// [`PaymentEngineError::GatewayUnavailable`] carrying its id, so that its status can be polled later.
pub struct OrderFlowApi<B, G> {
    db: B,
    gateway: G,
    signer: RequestSigner,
    callback_url: String,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl<B, G> Debug for OrderFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B, G> OrderFlowApi<B, G> {
    pub fn new<S: Into<String>>(db: B, gateway: G, signer: RequestSigner, callback_url: S) -> Self {
        Self {
            db,
            gateway,
            signer,
            callback_url: callback_url.into(),
            retry: RetryPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> OrderFlowApi<B, G>
where
    B: OrderManagement,
    G: PaymentGateway,
{
    /// Creates a new order for a (previously validated) payment request and obtains a payment URL for it.
    pub async fn create_payment(&self, request: NewPaymentRequest) -> Result<CreatedPayment, PaymentEngineError> {
        let created_at = self.clock.now();
        let order_id = new_order_id(created_at);
        let collection = CollectionRequest::new(&request.school_id, request.order_amount, &self.callback_url);
        let signed = self
            .signer
            .sign_collection_request(collection)
            .map_err(|e| PaymentEngineError::SigningError(e.to_string()))?;

        let status = OrderStatus::initial(order_id.clone(), request.order_amount, &request.payment_mode, created_at);
        let order = Order {
            order_id: order_id.clone(),
            school_id: request.school_id,
            trustee_id: request.trustee_id,
            student_info: request.student_info,
            gateway_name: request.gateway_name,
            created_at,
        };
        self.db.insert_order(&order, &status).await?;
        info!("🧾️ Order {order_id} for {} created for school {}", status.order_amount, order.school_id);

        let response = self.request_collection(&order_id, &signed).await.map_err(|e| {
            warn!("🧾️ [{order_id}] Could not obtain a payment URL. The order remains pending. {e}");
            PaymentEngineError::GatewayUnavailable { order_id: order_id.clone(), reason: e.to_string() }
        })?;
        if let Err(e) = self.db.attach_gateway_request(&order_id, &response.collect_request_id).await {
            warn!(
                "🧾️ [{order_id}] Could not record gateway request id {}. Polls will use the order id instead. {e}",
                response.collect_request_id
            );
        }
        debug!("🧾️ [{order_id}] Payment URL issued under collection request {}", response.collect_request_id);
        Ok(CreatedPayment {
            order_id,
            collect_request_id: response.collect_request_id,
            payment_url: response.collect_request_url,
        })
    }

    async fn request_collection(
        &self,
        order_id: &OrderId,
        request: &SignedCollectionRequest,
    ) -> Result<CollectionRequestResponse, GatewayApiError> {
        let mut attempt = 1;
        loop {
            match self.gateway.create_collection_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    debug!("🧾️ [{order_id}] Attempt {attempt} failed ({e}). Retrying in {}ms", delay.as_millis());
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }
}
