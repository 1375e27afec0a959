use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    db_types::{NewNotification, NotificationLogEntry, NotificationUpdate, OrderId, ProcessingState},
    events::EventProducers,
    helpers::new_notification_id,
    order_objects::ReconcileOutcome,
    spe_api::{errors::PaymentEngineError, reconciler::StatusReconciler, webhook_objects::WebhookPayload},
    traits::{Clock, NotificationLog, OrderManagement, SystemClock},
    webhook_objects::WebhookReceipt,
};

pub const ORDER_NOT_FOUND: &str = "order not found";

/// `WebhookApi` ingests payment outcome notifications pushed by the gateway.
///
/// Every notification is written to the notification log before anything else happens to it, including
/// notifications that turn out to be garbage. The log entry then tracks the notification through processing, and
/// records why it was rejected, if it was.
pub struct WebhookApi<B> {
    db: B,
    reconciler: StatusReconciler<B>,
    clock: Arc<dyn Clock>,
}

impl<B> Debug for WebhookApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookApi")
    }
}

impl<B: Clone> WebhookApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        let reconciler = StatusReconciler::new(db.clone(), producers);
        Self { db, reconciler, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> WebhookApi<B>
where B: OrderManagement + NotificationLog
{
    /// Processes a webhook body exactly as it came off the wire.
    ///
    /// A body that is not valid UTF-8 is still logged, with the invalid sequences replaced, and is then rejected as
    /// malformed. Everything else goes through [`Self::ingest`].
    pub async fn ingest_bytes(
        &self,
        raw_body: &[u8],
        remote_addr: Option<String>,
    ) -> Result<WebhookReceipt, PaymentEngineError> {
        match std::str::from_utf8(raw_body) {
            Ok(body) => self.ingest(body, remote_addr).await,
            Err(e) => {
                let lossy = String::from_utf8_lossy(raw_body);
                let notification_id = self.log_notification(&lossy, remote_addr).await?;
                let reason = format!("Notification body is not valid UTF-8. {e}");
                warn!("🪝️ Notification {notification_id} rejected. {reason}");
                self.mark_failed(&notification_id, None, &reason).await?;
                Err(PaymentEngineError::MalformedNotification(reason))
            },
        }
    }

    /// Processes the raw body of a webhook delivery.
    ///
    /// Returns a receipt for every notification that refers to a known order, whether or not the status report was
    /// accepted. Malformed bodies and unknown orders are errors, as are storage failures.
    pub async fn ingest(
        &self,
        raw_payload: &str,
        remote_addr: Option<String>,
    ) -> Result<WebhookReceipt, PaymentEngineError> {
        let notification_id = self.log_notification(raw_payload, remote_addr).await?;
        let payload = match serde_json::from_str::<WebhookPayload>(raw_payload) {
            Ok(p) => p,
            Err(e) => {
                let reason = format!("Could not parse notification body. {e}");
                self.mark_failed(&notification_id, None, &reason).await?;
                return Err(PaymentEngineError::MalformedNotification(reason));
            },
        };
        let report = match payload.status_report() {
            Ok(r) => r,
            Err(e) => {
                let reason = e.to_string();
                self.mark_failed(&notification_id, None, &reason).await?;
                return Err(PaymentEngineError::MalformedNotification(reason));
            },
        };
        self.db.update_notification(&NotificationUpdate::new(&notification_id, ProcessingState::Processing)).await?;

        let reference = payload.order_info.order_id.trim();
        let Some(order) = self.db.fetch_order_by_reference(reference).await? else {
            warn!("🪝️ Notification {notification_id} refers to unknown order '{reference}'");
            self.mark_failed(&notification_id, None, ORDER_NOT_FOUND).await?;
            return Err(PaymentEngineError::OrderNotFound(reference.to_string()));
        };
        let order_id = order.order_id;
        debug!("🪝️ Notification {notification_id} reports {} for order {order_id}", report.status);

        let outcome = match self.reconciler.reconcile(&order_id, &report).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.mark_failed(&notification_id, Some(order_id), &e.to_string()).await?;
                return Err(e);
            },
        };
        let processed_at = self.clock.now();
        let (update, reason) = match &outcome {
            ReconcileOutcome::Applied(_) | ReconcileOutcome::Unchanged(_) => {
                (NotificationUpdate::new(&notification_id, ProcessingState::Completed), None)
            },
            ReconcileOutcome::Stale { reason, .. } => {
                let reason = reason.to_string();
                (NotificationUpdate::new(&notification_id, ProcessingState::Failed).with_error(&reason), Some(reason))
            },
            ReconcileOutcome::Anomaly { current, incoming } => {
                let reason = format!(
                    "integrity anomaly: order is {} but the notification reports {incoming}. Flagged for review.",
                    current.status
                );
                let update = NotificationUpdate::new(&notification_id, ProcessingState::Failed)
                    .with_error(&reason)
                    .flag_for_review();
                (update, Some(reason))
            },
        };
        let update = update.with_order_id(order_id.clone()).processed_at(processed_at);
        self.db.update_notification(&update).await?;
        let receipt = WebhookReceipt {
            accepted: outcome.is_accepted(),
            notification_id,
            order_id: Some(order_id),
            status: Some(outcome.status().status),
            reason,
        };
        info!(
            "🪝️ Notification {} for order {:?} processed. accepted: {}",
            receipt.notification_id,
            receipt.order_id.as_ref().map(OrderId::as_str),
            receipt.accepted
        );
        Ok(receipt)
    }

    async fn log_notification(
        &self,
        raw_payload: &str,
        remote_addr: Option<String>,
    ) -> Result<String, PaymentEngineError> {
        let received_at = self.clock.now();
        let notification_id = new_notification_id(received_at);
        let notification = NewNotification {
            notification_id: notification_id.clone(),
            raw_payload: raw_payload.to_string(),
            remote_addr,
            received_at,
        };
        self.db.insert_notification(&notification).await?;
        trace!("🪝️ Notification {notification_id} logged");
        Ok(notification_id)
    }

    async fn mark_failed(
        &self,
        notification_id: &str,
        order_id: Option<OrderId>,
        reason: &str,
    ) -> Result<(), PaymentEngineError> {
        let mut update = NotificationUpdate::new(notification_id, ProcessingState::Failed)
            .with_error(reason)
            .processed_at(self.clock.now());
        update.order_id = order_id;
        self.db.update_notification(&update).await?;
        Ok(())
    }

    pub async fn fetch_notification(&self, notification_id: &str) -> Result<NotificationLogEntry, PaymentEngineError> {
        self.db.fetch_notification(notification_id).await?.ok_or_else(|| {
            PaymentEngineError::StoreError(crate::traits::StoreError::NotificationNotFound(notification_id.to_string()))
        })
    }

    /// Notifications whose reports conflicted with a terminal status and need a human to look at them.
    pub async fn notifications_for_review(&self) -> Result<Vec<NotificationLogEntry>, PaymentEngineError> {
        let entries = self.db.fetch_notifications_for_review().await?;
        Ok(entries)
    }
}
