use thiserror::Error;

use crate::{
    db_types::{OrderId, PaymentStatus},
    traits::StoreError,
    validation::ValidationError,
};

/// Everything that can go wrong in the engine APIs, from the caller's point of view.
///
/// Stale reports are deliberately absent. A stale report is an expected outcome of reconciliation
/// ([`ReconcileOutcome::Stale`](crate::order_objects::ReconcileOutcome::Stale)), not a failure.
#[derive(Debug, Error)]
pub enum PaymentEngineError {
    #[error("{0}")]
    ValidationError(#[from] ValidationError),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(String),
    #[error("Cannot create order, since it already exists with id {0}")]
    OrderAlreadyExists(OrderId),
    #[error("The payment gateway is unavailable. Order {order_id} has been saved and can be checked later. {reason}")]
    GatewayUnavailable { order_id: OrderId, reason: String },
    #[error("Order {order_id} is {stored}, but a report claims it is {incoming}. The order needs manual review.")]
    IntegrityAnomaly { order_id: OrderId, stored: PaymentStatus, incoming: PaymentStatus },
    #[error("Could not update order {0}. Too many concurrent updates.")]
    ConcurrencyConflict(OrderId),
    #[error("Malformed notification. {0}")]
    MalformedNotification(String),
    #[error("Could not sign the gateway request. {0}")]
    SigningError(String),
    #[error("{0}")]
    StoreError(StoreError),
}

impl From<StoreError> for PaymentEngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderAlreadyExists(id) => Self::OrderAlreadyExists(id),
            StoreError::OrderNotFound(id) => Self::OrderNotFound(id.to_string()),
            e => Self::StoreError(e),
        }
    }
}
