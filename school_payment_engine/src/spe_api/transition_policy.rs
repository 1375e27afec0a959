//! The status transition policy.
//!
//! Both inbound paths (webhooks and status polls) funnel every report through [`evaluate`], so neither can drive an
//! order into a state the other would refuse. The policy is a pure function of the stored record and the incoming
//! report; the [`StatusReconciler`](super::reconciler::StatusReconciler) takes care of applying its verdict
//! atomically.
//!
//! | stored \ incoming | non-terminal                       | terminal (same)      | terminal (different) |
//! |-------------------|------------------------------------|----------------------|----------------------|
//! | non-terminal      | forward or same-status if not older| apply                | apply                |
//! | terminal          | stale                              | fill placeholders    | anomaly              |
//!
//! A repeated terminal status that brings nothing but placeholders (or values we already have) is a pure no-op.
//!
//! `pending -> processing` is always allowed, regardless of timestamps. `processing -> pending` never is.
use crate::{
    db_types::{OrderStatus, PaymentStatus},
    order_objects::{StaleReason, StatusReport},
};

const PLACEHOLDERS: [&str; 5] = ["", "NA", "N/A", "PENDING", "Payment initiated"];

/// The policy's verdict on a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Write this record.
    Apply(OrderStatus),
    /// Nothing new. Leave the stored record as is.
    NoOp,
    /// Reject the report.
    Stale(StaleReason),
    /// Reject the report and raise the alarm.
    Anomaly,
}

/// Values that only stand in for information the gateway hasn't supplied yet. Case-insensitive.
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    PLACEHOLDERS.iter().any(|p| p.eq_ignore_ascii_case(value))
}

pub fn evaluate(current: &OrderStatus, report: &StatusReport) -> Decision {
    use PaymentStatus::*;
    let stored = current.status;
    let incoming = report.status;
    match (stored.is_terminal(), incoming.is_terminal()) {
        (true, true) if stored == incoming => fill_placeholders(current, report),
        (true, true) => Decision::Anomaly,
        (true, false) => Decision::Stale(StaleReason::TerminalDowngrade),
        (false, true) => finish(current, apply(current, report)),
        (false, false) if incoming.rank() < stored.rank() => Decision::Stale(StaleReason::StatusRegression),
        (false, false) if stored == Pending && incoming == Processing => finish(current, apply(current, report)),
        (false, false) if report.reported_at < current.last_updated_at => Decision::Stale(StaleReason::OutOfOrder),
        (false, false) => finish(current, apply(current, report)),
    }
}

fn finish(current: &OrderStatus, candidate: OrderStatus) -> Decision {
    if candidate.same_outcome(current) && candidate.last_updated_at == current.last_updated_at {
        Decision::NoOp
    } else {
        Decision::Apply(candidate)
    }
}

/// A supplied value replaces the stored one, unless the supplied value is a placeholder and the stored one isn't.
fn overwrite(field: &mut String, incoming: &Option<String>) {
    if let Some(v) = incoming.as_deref().map(str::trim) {
        if !v.is_empty() && (!is_placeholder(v) || is_placeholder(field)) {
            *field = v.to_string();
        }
    }
}

/// A supplied value is only used if the stored one is a placeholder.
fn fill(field: &mut String, incoming: &Option<String>) {
    if let Some(v) = incoming.as_deref().map(str::trim) {
        if is_placeholder(field) && !is_placeholder(v) {
            *field = v.to_string();
        }
    }
}

fn apply(current: &OrderStatus, report: &StatusReport) -> OrderStatus {
    let mut next = current.clone();
    next.status = report.status;
    if let Some(amount) = report.transaction_amount {
        next.transaction_amount = amount;
    }
    overwrite(&mut next.payment_mode, &report.payment_mode);
    overwrite(&mut next.payment_details, &report.payment_details);
    overwrite(&mut next.bank_reference, &report.bank_reference);
    overwrite(&mut next.payment_message, &report.payment_message);
    overwrite(&mut next.error_message, &report.error_message);
    next.last_updated_at = current.last_updated_at.max(report.reported_at);
    next.source_of_last_update = report.source;
    next
}

/// A repeat of the stored terminal status. Unless it fills in a placeholder, nothing about the record changes, not
/// even its timestamp or source.
fn fill_placeholders(current: &OrderStatus, report: &StatusReport) -> Decision {
    let mut next = current.clone();
    fill(&mut next.payment_mode, &report.payment_mode);
    fill(&mut next.payment_details, &report.payment_details);
    fill(&mut next.bank_reference, &report.bank_reference);
    fill(&mut next.payment_message, &report.payment_message);
    fill(&mut next.error_message, &report.error_message);
    if next.same_outcome(current) {
        return Decision::NoOp;
    }
    next.last_updated_at = current.last_updated_at.max(report.reported_at);
    next.source_of_last_update = report.source;
    Decision::Apply(next)
}
