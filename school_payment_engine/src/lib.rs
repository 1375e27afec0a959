//! School Payment Engine
//!
//! The School Payment Engine tracks fee payments that schools collect from students through an external payment
//! gateway. This library holds the core logic: order creation, the payment status state machine, and reconciliation
//! of the (late, duplicated, reordered) reports that the gateway sends back about each payment.
//!
//! The library is divided into these main sections:
//! 1. Storage ([`mod@traits`] and [`mod@sqlite`]). The engine APIs are generic over the storage traits; SQLite is the
//!    supplied backend. The record types live in [`mod@db_types`] and are public.
//! 2. The payment engine public API ([`mod@spe_api`]). Order creation, webhook ingestion, status polling and
//!    transaction queries. Every status report, whichever path it arrives by, is merged through the same transition
//!    policy under an optimistic compare-and-swap.
//!
//! The engine also emits events (see [`mod@events`]) when an order's status changes, and when a report contradicts a
//! settled payment. A simple actor framework lets you hook into these events.
pub mod db_types;
pub mod events;
pub mod helpers;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod spe_api;
pub mod traits;
pub mod validation;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use spe_api::{
    errors::PaymentEngineError,
    order_flow_api::OrderFlowApi,
    order_objects,
    reconciler::StatusReconciler,
    status_poller_api::StatusPollerApi,
    transaction_api::TransactionApi,
    webhook_api::WebhookApi,
    webhook_objects,
};
pub use traits::{Clock, NotificationLog, OrderManagement, StoreError, SystemClock, TransactionQueries};
pub use validation::ValidationError;
