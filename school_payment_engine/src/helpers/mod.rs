mod backoff;
mod ids;

pub use backoff::RetryPolicy;
pub use ids::{new_notification_id, new_order_id, NOTIFICATION_ID_PREFIX, ORDER_ID_PREFIX};
