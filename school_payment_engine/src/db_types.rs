use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spg_common::Amount;
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid {kind}: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

impl ConversionError {
    pub fn new<S: Into<String>>(kind: &'static str, value: S) -> Self {
        Self { kind, value: value.into() }
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    PaymentStatus      ---------------------------------------------------------
/// The lifecycle of a payment: `Pending -> Processing -> {Success, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// The order exists, but the payer has not started (or finished starting) the payment.
    Pending,
    /// The gateway has accepted the payment and is waiting on the bank.
    Processing,
    /// Funds have been collected. Terminal.
    Success,
    /// The payment was declined, dropped or cancelled. Terminal.
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Position along the lifecycle. Both terminal states share the final rank.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Success | Self::Failed => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(ConversionError::new("payment status", s)),
        }
    }
}

//--------------------------------------     UpdateSource      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UpdateSource {
    Creation,
    Webhook,
    Poll,
}

impl Display for UpdateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Creation => write!(f, "creation"),
            Self::Webhook => write!(f, "webhook"),
            Self::Poll => write!(f, "poll"),
        }
    }
}

//--------------------------------------   ProcessingState     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    Received,
    Processing,
    Completed,
    Failed,
}

impl Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

//--------------------------------------      StudentInfo      ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StudentInfo {
    #[sqlx(rename = "student_name")]
    pub name: String,
    /// The school's own identifier for the student
    #[sqlx(rename = "student_id")]
    #[serde(rename = "id", alias = "external_id")]
    pub external_id: String,
    #[sqlx(rename = "student_email")]
    pub email: String,
}

impl StudentInfo {
    pub fn new<S: Into<String>>(name: S, external_id: S, email: S) -> Self {
        Self { name: name.into(), external_id: external_id.into(), email: email.into() }
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
/// A requested payment. Orders never change once they are stored.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub school_id: String,
    pub trustee_id: String,
    #[sqlx(flatten)]
    pub student_info: StudentInfo,
    pub gateway_name: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      OrderStatus      ---------------------------------------------------------
pub const DEFAULT_PAYMENT_DETAILS: &str = "Pending";
pub const DEFAULT_BANK_REFERENCE: &str = "PENDING";
pub const DEFAULT_PAYMENT_MESSAGE: &str = "Payment initiated";
pub const DEFAULT_ERROR_MESSAGE: &str = "NA";

/// What is currently known about the outcome of an [`Order`]. There is exactly one of these per order.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderStatus {
    pub order_id: OrderId,
    pub order_amount: Amount,
    pub transaction_amount: Amount,
    pub payment_mode: String,
    pub payment_details: String,
    pub bank_reference: String,
    pub payment_message: String,
    pub status: PaymentStatus,
    pub error_message: String,
    /// The gateway's identifier for the collection request, once one has been created
    pub gateway_request_id: Option<String>,
    pub last_updated_at: DateTime<Utc>,
    pub source_of_last_update: UpdateSource,
    /// Optimistic concurrency stamp. Incremented by the store on every successful conditional write.
    pub version: i64,
}

impl OrderStatus {
    /// The status record that is created alongside a brand-new order.
    pub fn initial(order_id: OrderId, order_amount: Amount, payment_mode: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            order_id,
            order_amount,
            transaction_amount: order_amount,
            payment_mode: payment_mode.to_string(),
            payment_details: DEFAULT_PAYMENT_DETAILS.to_string(),
            bank_reference: DEFAULT_BANK_REFERENCE.to_string(),
            payment_message: DEFAULT_PAYMENT_MESSAGE.to_string(),
            status: PaymentStatus::Pending,
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            gateway_request_id: None,
            last_updated_at: created_at,
            source_of_last_update: UpdateSource::Creation,
            version: 0,
        }
    }

    /// True if the two records describe the same payment outcome, ignoring bookkeeping (`last_updated_at`,
    /// `source_of_last_update` and `version`).
    pub fn same_outcome(&self, other: &OrderStatus) -> bool {
        self.order_id == other.order_id &&
            self.status == other.status &&
            self.order_amount == other.order_amount &&
            self.transaction_amount == other.transaction_amount &&
            self.payment_mode == other.payment_mode &&
            self.payment_details == other.payment_details &&
            self.bank_reference == other.bank_reference &&
            self.payment_message == other.payment_message &&
            self.error_message == other.error_message
    }
}

//--------------------------------------   NotificationLog     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct NotificationLogEntry {
    pub notification_id: String,
    pub order_id: Option<OrderId>,
    pub raw_payload: String,
    pub processing_state: ProcessingState,
    pub error_message: Option<String>,
    /// Set when the notification revealed a data-integrity anomaly that needs a human to look at it
    pub needs_review: bool,
    pub remote_addr: Option<String>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub notification_id: String,
    pub raw_payload: String,
    pub remote_addr: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// An in-place update of a notification log entry's processing state.
#[derive(Debug, Clone)]
pub struct NotificationUpdate {
    pub notification_id: String,
    pub processing_state: ProcessingState,
    pub order_id: Option<OrderId>,
    pub error_message: Option<String>,
    pub needs_review: bool,
    pub processed_at: Option<DateTime<Utc>>,
}

impl NotificationUpdate {
    pub fn new<S: Into<String>>(notification_id: S, processing_state: ProcessingState) -> Self {
        Self {
            notification_id: notification_id.into(),
            processing_state,
            order_id: None,
            error_message: None,
            needs_review: false,
            processed_at: None,
        }
    }

    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_error<S: Into<String>>(mut self, error: S) -> Self {
        self.error_message = Some(error.into());
        self
    }

    pub fn flag_for_review(mut self) -> Self {
        self.needs_review = true;
        self
    }

    pub fn processed_at(mut self, at: DateTime<Utc>) -> Self {
        self.processed_at = Some(at);
        self
    }
}
