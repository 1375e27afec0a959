use std::{fmt::Debug, sync::Arc};

use gateway_tools::{CollectionStatusResponse, PaymentGateway, RequestSigner};
use log::*;

use crate::{
    db_types::{ConversionError, OrderStatus, PaymentStatus, UpdateSource},
    events::EventProducers,
    order_objects::{ReconcileOutcome, StatusReport},
    spe_api::{errors::PaymentEngineError, reconciler::StatusReconciler},
    traits::{Clock, OrderManagement, SystemClock},
};

/// `StatusPollerApi` actively asks the gateway for the state of a payment, for when webhooks are late or never come.
///
/// Poll results go through exactly the same reconciliation as webhooks, so a poll can never undo what a webhook
/// already settled.
pub struct StatusPollerApi<B, G> {
    db: B,
    gateway: G,
    signer: RequestSigner,
    reconciler: StatusReconciler<B>,
    clock: Arc<dyn Clock>,
}

impl<B, G> Debug for StatusPollerApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StatusPollerApi")
    }
}

impl<B: Clone, G> StatusPollerApi<B, G> {
    pub fn new(db: B, gateway: G, signer: RequestSigner, producers: EventProducers) -> Self {
        let reconciler = StatusReconciler::new(db.clone(), producers);
        Self { db, gateway, signer, reconciler, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<B, G> StatusPollerApi<B, G>
where
    B: OrderManagement,
    G: PaymentGateway,
{
    /// Fetches the gateway's view of the order identified by `reference` (our order id or the gateway's collection
    /// request id), reconciles it, and returns the resulting status record.
    ///
    /// A stale poll result is not an error; the stored (unchanged) record is returned. A poll result that contradicts a
    /// terminal status is returned as [`PaymentEngineError::IntegrityAnomaly`].
    pub async fn poll(&self, reference: &str) -> Result<OrderStatus, PaymentEngineError> {
        let order = self
            .db
            .fetch_order_by_reference(reference)
            .await?
            .ok_or_else(|| PaymentEngineError::OrderNotFound(reference.to_string()))?;
        let order_id = order.order_id;
        let current = self
            .db
            .fetch_order_status(&order_id)
            .await?
            .ok_or_else(|| PaymentEngineError::OrderNotFound(order_id.to_string()))?;
        let gateway_ref = current.gateway_request_id.clone().unwrap_or_else(|| order_id.to_string());
        let query = self
            .signer
            .sign_status_query(&gateway_ref, &order.school_id)
            .map_err(|e| PaymentEngineError::SigningError(e.to_string()))?;
        let response = self.gateway.query_status(&query).await.map_err(|e| {
            warn!("🔄️ [{order_id}] Status poll failed. {e}");
            PaymentEngineError::GatewayUnavailable { order_id: order_id.clone(), reason: e.to_string() }
        })?;
        let report = status_report_from_poll(&response, self.clock.now()).map_err(|e| {
            warn!("🔄️ [{order_id}] Gateway returned a status we don't understand. {e}");
            PaymentEngineError::GatewayUnavailable { order_id: order_id.clone(), reason: e.to_string() }
        })?;
        debug!("🔄️ [{order_id}] Poll reports {}", report.status);
        match self.reconciler.reconcile(&order_id, &report).await? {
            ReconcileOutcome::Applied(s) |
            ReconcileOutcome::Unchanged(s) |
            ReconcileOutcome::Stale { current: s, .. } => Ok(s),
            ReconcileOutcome::Anomaly { current, incoming } => {
                Err(PaymentEngineError::IntegrityAnomaly { order_id, stored: current.status, incoming })
            },
        }
    }
}

/// Maps the gateway's status vocabulary onto ours.
pub fn parse_gateway_status(status: &str) -> Result<PaymentStatus, ConversionError> {
    match status.trim().to_ascii_uppercase().as_str() {
        "NOT_INITIATED" | "CREATED" | "PENDING" => Ok(PaymentStatus::Pending),
        "PROCESSING" => Ok(PaymentStatus::Processing),
        "SUCCESS" => Ok(PaymentStatus::Success),
        "FAILED" | "FAILURE" | "USER_DROPPED" | "CANCELLED" => Ok(PaymentStatus::Failed),
        _ => Err(ConversionError::new("gateway status", status)),
    }
}

/// Converts a poll response into a status report stamped with the time the response was received.
pub fn status_report_from_poll(
    response: &CollectionStatusResponse,
    received_at: chrono::DateTime<chrono::Utc>,
) -> Result<StatusReport, ConversionError> {
    let status = parse_gateway_status(&response.status)?;
    let mut report = StatusReport::new(status, received_at, UpdateSource::Poll);
    report.transaction_amount = response.transaction_amount.or(response.amount);
    report.payment_mode = response.payment_mode.clone();
    report.payment_details = response.payment_details.clone();
    report.bank_reference = response.bank_reference.clone();
    report.payment_message = response.message.clone();
    Ok(report)
}
