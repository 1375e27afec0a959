use std::fmt::Debug;

use log::*;

use crate::{
    db_types::OrderId,
    events::{EventProducers, IntegrityAnomalyEvent, OrderStatusChangedEvent},
    order_objects::{ReconcileOutcome, StatusReport},
    spe_api::{
        errors::PaymentEngineError,
        transition_policy::{evaluate, Decision},
    },
    traits::OrderManagement,
};

/// How many times a lost compare-and-swap race is retried before giving up.
pub const MAX_CAS_ATTEMPTS: usize = 5;

/// Merges external status reports into the stored [`OrderStatus`](crate::db_types::OrderStatus).
///
/// Each attempt reads the current record, asks the transition policy for a verdict, and (if the verdict is to write)
/// performs a conditional write guarded by the record's version. If another writer changed the record in the
/// meantime, the whole read-evaluate-write cycle is repeated against the fresh record. No lock is held across any of
/// these steps.
#[derive(Clone)]
pub struct StatusReconciler<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for StatusReconciler<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StatusReconciler")
    }
}

impl<B> StatusReconciler<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> StatusReconciler<B>
where B: OrderManagement
{
    pub async fn reconcile(
        &self,
        order_id: &OrderId,
        report: &StatusReport,
    ) -> Result<ReconcileOutcome, PaymentEngineError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let current = self
                .db
                .fetch_order_status(order_id)
                .await?
                .ok_or_else(|| PaymentEngineError::OrderNotFound(order_id.to_string()))?;
            let outcome = match evaluate(&current, report) {
                Decision::Apply(candidate) => {
                    match self.db.compare_and_swap_status(&candidate, current.version).await? {
                        Some(updated) => {
                            debug!(
                                "🔄️ [{order_id}] {} -> {} via {} (v{})",
                                current.status, updated.status, report.source, updated.version
                            );
                            let event = OrderStatusChangedEvent::new(current, updated.clone());
                            self.producers.publish_status_changed(event).await;
                            ReconcileOutcome::Applied(updated)
                        },
                        None => {
                            debug!("🔄️ [{order_id}] Lost a race on attempt {attempt}. Re-evaluating.");
                            continue;
                        },
                    }
                },
                Decision::NoOp => {
                    debug!("🔄️ [{order_id}] {} report from {} carries nothing new", report.status, report.source);
                    ReconcileOutcome::Unchanged(current)
                },
                Decision::Stale(reason) => {
                    info!(
                        "🔄️ [{order_id}] Rejected {} report from {} (stored: {}). {reason}",
                        report.status, report.source, current.status
                    );
                    ReconcileOutcome::Stale { current, reason }
                },
                Decision::Anomaly => {
                    error!(
                        "🔄️ [{order_id}] INTEGRITY ANOMALY. Stored status is {} but {} reports {}. Nothing has been \
                         changed. This order needs manual review.",
                        current.status, report.source, report.status
                    );
                    let event = IntegrityAnomalyEvent {
                        order_id: order_id.clone(),
                        stored: current.status,
                        incoming: report.status,
                        source: report.source,
                        reported_at: report.reported_at,
                    };
                    self.producers.publish_integrity_anomaly(event).await;
                    ReconcileOutcome::Anomaly { current, incoming: report.status }
                },
            };
            return Ok(outcome);
        }
        warn!("🔄️ [{order_id}] Gave up after {MAX_CAS_ATTEMPTS} lost compare-and-swap races");
        Err(PaymentEngineError::ConcurrencyConflict(order_id.clone()))
    }
}
