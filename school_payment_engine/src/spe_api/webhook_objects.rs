use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spg_common::Amount;

use crate::{
    db_types::{ConversionError, OrderId, PaymentStatus, UpdateSource},
    order_objects::StatusReport,
};

/// The body of a gateway webhook.
///
/// ```json
/// { "status": 200,
///   "order_info": { "order_id": "ORD_1745397261945_k3j9x0a2b", "order_amount": 1000, "transaction_amount": 1000,
///                   "gateway": "PhonePe", "bank_reference": "YESBNK222", "status": "success",
///                   "payment_mode": "upi", "payment_details": "success@ybl",
///                   "payment_message": "payment success", "payment_time": "2025-04-23T08:14:21.945Z",
///                   "error_message": "NA" } }
/// ```
///
/// The top-level `status` is the gateway's delivery code. The payment outcome is `order_info.status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub status: Option<i64>,
    pub order_info: WebhookOrderInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookOrderInfo {
    /// Our order id, or the gateway's collection request id
    pub order_id: String,
    pub order_amount: Option<Amount>,
    pub transaction_amount: Option<Amount>,
    pub gateway: Option<String>,
    pub bank_reference: Option<String>,
    pub status: String,
    pub payment_mode: Option<String>,
    pub payment_details: Option<String>,
    pub payment_message: Option<String>,
    pub payment_time: DateTime<Utc>,
    pub error_message: Option<String>,
}

impl WebhookPayload {
    pub fn status_report(&self) -> Result<StatusReport, ConversionError> {
        let info = &self.order_info;
        let status = info.status.parse::<PaymentStatus>()?;
        let mut report = StatusReport::new(status, info.payment_time, UpdateSource::Webhook);
        report.transaction_amount = info.transaction_amount;
        report.payment_mode = info.payment_mode.clone();
        report.payment_details = info.payment_details.clone();
        report.bank_reference = info.bank_reference.clone();
        report.payment_message = info.payment_message.clone();
        report.error_message = info.error_message.clone();
        Ok(report)
    }
}

/// The acknowledgement sent back to the gateway.
///
/// `accepted` is true when the notification was applied, or was a harmless duplicate. Stale and conflicting
/// notifications are acknowledged too (so the gateway stops retrying them), but with `accepted: false` and a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookReceipt {
    pub accepted: bool,
    pub notification_id: String,
    pub order_id: Option<OrderId>,
    pub status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
