use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spg_common::Amount;
use sqlx::FromRow;

use crate::db_types::{OrderId, OrderStatus, PaymentStatus, StudentInfo, UpdateSource};

//--------------------------------------   NewPaymentRequest   ---------------------------------------------------------
/// A request to stand up a new order and hand it to the payment gateway.
///
/// Call [`NewPaymentRequest::validate`](crate::validation) before passing it to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPaymentRequest {
    pub school_id: String,
    pub trustee_id: String,
    pub student_info: StudentInfo,
    #[serde(alias = "gateway")]
    pub gateway_name: String,
    pub order_amount: Amount,
    pub payment_mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPayment {
    pub order_id: OrderId,
    pub collect_request_id: String,
    pub payment_url: String,
}

//--------------------------------------     StatusReport      ---------------------------------------------------------
/// An external claim about the state of a payment, from either a webhook or a status poll. Fields the reporter did not
/// supply are `None` and leave the stored values alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: PaymentStatus,
    pub reported_at: DateTime<Utc>,
    pub source: UpdateSource,
    pub transaction_amount: Option<Amount>,
    pub payment_mode: Option<String>,
    pub payment_details: Option<String>,
    pub bank_reference: Option<String>,
    pub payment_message: Option<String>,
    pub error_message: Option<String>,
}

impl StatusReport {
    pub fn new(status: PaymentStatus, reported_at: DateTime<Utc>, source: UpdateSource) -> Self {
        Self {
            status,
            reported_at,
            source,
            transaction_amount: None,
            payment_mode: None,
            payment_details: None,
            bank_reference: None,
            payment_message: None,
            error_message: None,
        }
    }

    pub fn with_transaction_amount(mut self, amount: Amount) -> Self {
        self.transaction_amount = Some(amount);
        self
    }

    pub fn with_payment_mode<S: Into<String>>(mut self, mode: S) -> Self {
        self.payment_mode = Some(mode.into());
        self
    }

    pub fn with_payment_details<S: Into<String>>(mut self, details: S) -> Self {
        self.payment_details = Some(details.into());
        self
    }

    pub fn with_bank_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.bank_reference = Some(reference.into());
        self
    }

    pub fn with_payment_message<S: Into<String>>(mut self, message: S) -> Self {
        self.payment_message = Some(message.into());
        self
    }

    pub fn with_error_message<S: Into<String>>(mut self, message: S) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

//--------------------------------------   ReconcileOutcome    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// A non-terminal report for an order that has already reached a terminal state
    TerminalDowngrade,
    /// A report that would move the status backwards along the lifecycle
    StatusRegression,
    /// A report older than the last applied update
    OutOfOrder,
}

impl Display for StaleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TerminalDowngrade => write!(f, "stale: order is already in a terminal state"),
            Self::StatusRegression => write!(f, "stale: status would move backwards"),
            Self::OutOfOrder => write!(f, "stale: report is older than the last update"),
        }
    }
}

/// What happened when a [`StatusReport`] was reconciled against the stored status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The report changed the stored status. Holds the new record.
    Applied(OrderStatus),
    /// The report carried nothing new (e.g. a duplicate delivery). Holds the stored record.
    Unchanged(OrderStatus),
    /// The report was rejected by the transition policy.
    Stale { current: OrderStatus, reason: StaleReason },
    /// The report contradicts a terminal status. Nothing was written; this needs a human.
    Anomaly { current: OrderStatus, incoming: PaymentStatus },
}

impl ReconcileOutcome {
    pub fn status(&self) -> &OrderStatus {
        match self {
            Self::Applied(s) | Self::Unchanged(s) => s,
            Self::Stale { current, .. } | Self::Anomaly { current, .. } => current,
        }
    }

    /// Applied updates and idempotent duplicates are both "accepted" from the reporter's point of view.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Applied(_) | Self::Unchanged(_))
    }
}

//--------------------------------------   TransactionQuery    ---------------------------------------------------------
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    LastUpdatedAt,
    CreatedAt,
    OrderAmount,
    TransactionAmount,
    Status,
    SchoolId,
    OrderId,
}

impl SortField {
    /// The fully qualified column this field sorts on. Only these fixed strings ever reach the SQL.
    pub fn column(&self) -> &'static str {
        match self {
            Self::LastUpdatedAt => "s.last_updated_at",
            Self::CreatedAt => "o.created_at",
            Self::OrderAmount => "s.order_amount",
            Self::TransactionAmount => "s.transaction_amount",
            Self::Status => "s.status",
            Self::SchoolId => "o.school_id",
            Self::OrderId => "o.order_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Raw query-string parameters for the transaction listing. Convert to a [`TransactionQuery`] with `try_from`, which
/// validates every field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionQueryParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub status: Option<String>,
    #[serde(alias = "schoolId")]
    pub school_id: Option<String>,
    #[serde(alias = "dateFrom")]
    pub date_from: Option<String>,
    #[serde(alias = "dateTo")]
    pub date_to: Option<String>,
}

/// A validated transaction listing query. `date_from` and `date_to` are inclusive bounds on `last_updated_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    pub page: u32,
    pub limit: u32,
    pub sort: SortField,
    pub order: SortOrder,
    pub status: Option<PaymentStatus>,
    pub school_id: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            sort: SortField::default(),
            order: SortOrder::default(),
            status: None,
            school_id: None,
            date_from: None,
            date_to: None,
        }
    }
}

impl TransactionQuery {
    pub fn with_page(mut self, page: u32, limit: u32) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    pub fn sorted_by(mut self, sort: SortField, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_school_id<S: Into<String>>(mut self, school_id: S) -> Self {
        self.school_id = Some(school_id.into());
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

//--------------------------------------   TransactionRecord   ---------------------------------------------------------
/// An order joined with its current status.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub order_id: OrderId,
    pub school_id: String,
    pub trustee_id: String,
    #[serde(rename = "gateway")]
    pub gateway_name: String,
    #[sqlx(flatten)]
    pub student_info: StudentInfo,
    pub order_amount: Amount,
    pub transaction_amount: Amount,
    pub status: PaymentStatus,
    pub payment_mode: String,
    pub payment_details: String,
    pub bank_reference: String,
    pub payment_message: String,
    pub error_message: String,
    pub gateway_request_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub source_of_last_update: UpdateSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPage {
    pub items: Vec<TransactionRecord>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

impl TransactionPage {
    pub fn new(items: Vec<TransactionRecord>, query: &TransactionQuery, total: u64) -> Self {
        let limit = u64::from(query.limit.max(1));
        let total_pages = total.div_ceil(limit);
        Self { items, page: query.page, limit: query.limit, total, total_pages }
    }
}
