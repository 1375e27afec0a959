//! Event hooks that the server attaches to the payment engine.
//!
//! Integrity anomalies (a report that contradicts an already-terminal outcome) are never applied. They are logged at
//! `error` level here, which is what operators alert on, and the offending notification is flagged for review.
use std::{future::Future, pin::Pin};

use log::*;
use school_payment_engine::events::{EventHandlers, EventHooks};

pub const EVENT_BUFFER_SIZE: usize = 25;

fn no_op() -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async {})
}

pub fn create_alert_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_status_changed(|ev| {
        info!(
            "📬️ Order {} moved from {} to {} ({} at {})",
            ev.order_id(),
            ev.old_status.status,
            ev.new_status.status,
            ev.new_status.source_of_last_update,
            ev.new_status.last_updated_at
        );
        no_op()
    });
    hooks.on_integrity_anomaly(|ev| {
        error!(
            "🚨️ INTEGRITY ANOMALY on order {}. Stored outcome is {}, but a {} report from {} claims {}. The order \
             needs manual review.",
            ev.order_id, ev.stored, ev.source, ev.reported_at, ev.incoming
        );
        no_op()
    });
    EventHandlers::new(EVENT_BUFFER_SIZE, hooks)
}
