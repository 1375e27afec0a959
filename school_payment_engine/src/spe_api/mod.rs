//! The public face of the payment engine.
//!
//! * [`order_flow_api::OrderFlowApi`] creates orders and obtains payment URLs from the gateway.
//! * [`webhook_api::WebhookApi`] ingests gateway notifications, keeping an audit trail of every one of them.
//! * [`status_poller_api::StatusPollerApi`] asks the gateway for the current state of an order on demand.
//! * [`transaction_api::TransactionApi`] lists and looks up transactions.
//!
//! Webhooks and polls both funnel through [`reconciler::StatusReconciler`], which applies the
//! [`transition_policy`] under an optimistic compare-and-swap.
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod reconciler;
pub mod status_poller_api;
pub mod transaction_api;
pub mod transition_policy;
pub mod webhook_api;
pub mod webhook_objects;
