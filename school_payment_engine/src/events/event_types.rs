use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{OrderId, OrderStatus, PaymentStatus, UpdateSource};

/// Published every time the transition policy accepts a report and the stored status changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
}

impl OrderStatusChangedEvent {
    pub fn new(old_status: OrderStatus, new_status: OrderStatus) -> Self {
        Self { old_status, new_status }
    }

    pub fn order_id(&self) -> &OrderId {
        &self.new_status.order_id
    }
}

/// Published when a report claims a terminal outcome that contradicts the stored terminal outcome. Nothing is written
/// when this happens, and somebody needs to look into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityAnomalyEvent {
    pub order_id: OrderId,
    pub stored: PaymentStatus,
    pub incoming: PaymentStatus,
    pub source: UpdateSource,
    pub reported_at: DateTime<Utc>,
}

