//! # Order store and collaborator contracts
//!
//! The traits in this module define what a storage backend must provide for the payment engine to run on top of it.
//! The engine APIs are generic over these traits, so tests can swap in fakes and a different database could be
//! supported without touching the reconciliation logic.
//!
//! * [`OrderManagement`] creates orders (together with their status record) and performs the conditional writes that
//!   keep concurrent webhook and poll updates from clobbering each other.
//! * [`NotificationLog`] stores the audit trail of inbound gateway notifications.
//! * [`TransactionQueries`] is the read side: filtered, sorted and paginated views over orders and their status.
//! * [`Clock`] is the engine's only source of "now".
mod clock;
mod notification_log;
mod order_management;
mod store_error;
mod transaction_queries;

pub use clock::{Clock, SystemClock};
pub use notification_log::NotificationLog;
pub use order_management::OrderManagement;
pub use store_error::StoreError;
pub use transaction_queries::TransactionQueries;
