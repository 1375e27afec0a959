use chrono::Duration;
use cucumber::{given, then, when};
use school_payment_engine::{
    db_types::{NotificationLogEntry, PaymentStatus, ProcessingState},
    order_objects::TransactionQuery,
    webhook_objects::WebhookReceipt,
    PaymentEngineError,
};
use spg_common::Amount;

use crate::{
    cucumber::PaymentWorld,
    support::{t0, webhook_body, TestSystem},
};

#[given("a fresh install")]
async fn fresh_install(world: &mut PaymentWorld) {
    world.system = Some(TestSystem::new().await);
}

#[when(expr = "school {string} creates an order {word} for {int}")]
async fn create_order(world: &mut PaymentWorld, school_id: String, label: String, amount: i64) {
    let id = world.system().create_order(&school_id, amount).await;
    world.orders.insert(label, id);
}

async fn send_webhook(world: &mut PaymentWorld, reference: &str, status: &str, amount: i64, minute: i64) {
    let body = webhook_body(reference, status, amount, t0() + Duration::minutes(minute));
    let result = world.system().webhooks.ingest(&body, Some("127.0.0.1".into())).await;
    world.last_webhook = Some(result);
}

#[when(expr = "the gateway sends a {string} webhook for order {word} with amount {int} at minute {int}")]
async fn webhook(world: &mut PaymentWorld, status: String, label: String, amount: i64, minute: i64) {
    let reference = world.order(&label).to_string();
    send_webhook(world, &reference, &status, amount, minute).await;
}

#[when(expr = "the gateway sends a {string} webhook for order {word} with amount {int} at minute {int}, {int} times")]
async fn repeated_webhook(world: &mut PaymentWorld, status: String, label: String, amount: i64, minute: i64, n: u32) {
    let reference = world.order(&label).to_string();
    for _ in 0..n {
        send_webhook(world, &reference, &status, amount, minute).await;
    }
}

#[when(expr = "the gateway sends a {string} webhook for unknown order {string} with amount {int} at minute {int}")]
async fn unknown_webhook(world: &mut PaymentWorld, status: String, reference: String, amount: i64, minute: i64) {
    send_webhook(world, &reference, &status, amount, minute).await;
}

#[when(expr = "the gateway will report {string} for the next poll")]
async fn script_poll(world: &mut PaymentWorld, status: String) {
    world.system().gateway.push_status(&status);
}

#[when(expr = "I poll order {word} at minute {int}")]
async fn poll(world: &mut PaymentWorld, label: String, minute: i64) {
    let sys = world.system();
    sys.clock.set(t0() + Duration::minutes(minute));
    let id = world.order(&label);
    sys.poller.poll(id.as_str()).await.expect("Error polling order status");
}

fn last_webhook(world: &PaymentWorld) -> &Result<WebhookReceipt, PaymentEngineError> {
    world.last_webhook.as_ref().expect("No webhook has been sent")
}

#[then("the webhook is accepted")]
async fn webhook_accepted(world: &mut PaymentWorld) {
    let receipt = last_webhook(world).as_ref().expect("Webhook failed");
    assert!(receipt.accepted, "Webhook was not accepted: {:?}", receipt.reason);
}

#[then("the webhook is not accepted")]
async fn webhook_not_accepted(world: &mut PaymentWorld) {
    let receipt = last_webhook(world).as_ref().expect("Webhook failed");
    assert!(!receipt.accepted, "Webhook was accepted");
}

#[then("the webhook is rejected because the order was not found")]
async fn webhook_order_not_found(world: &mut PaymentWorld) {
    match last_webhook(world) {
        Err(PaymentEngineError::OrderNotFound(_)) => {},
        other => panic!("Expected an order-not-found error, got {other:?}"),
    }
}

#[then(expr = "order {word} has status {string}")]
async fn order_status(world: &mut PaymentWorld, label: String, status: String) {
    let expected = status.parse::<PaymentStatus>().expect("Not a valid status");
    let status = world.system().status(world.order(&label)).await;
    assert_eq!(status.status, expected);
}

#[then(expr = "order {word} has transaction amount {int}")]
async fn transaction_amount(world: &mut PaymentWorld, label: String, amount: i64) {
    let tx = world.system().transactions.transaction(world.order(&label)).await.expect("Transaction lookup failed");
    assert_eq!(tx.transaction_amount, Amount::from_major(amount));
}

#[then(expr = "order {word} has version {int}")]
async fn order_version(world: &mut PaymentWorld, label: String, version: i64) {
    let status = world.system().status(world.order(&label)).await;
    assert_eq!(status.version, version);
}

#[then(expr = "the notification log holds {int} failed notification(s) with reason {string}")]
async fn failed_notifications(world: &mut PaymentWorld, count: usize, reason: String) {
    let entries: Vec<NotificationLogEntry> = sqlx::query_as("SELECT * FROM notification_log")
        .fetch_all(world.system().db.pool())
        .await
        .expect("Error reading notification log");
    let failed = entries
        .iter()
        .filter(|e| e.processing_state == ProcessingState::Failed)
        .filter(|e| e.error_message.as_deref() == Some(reason.as_str()))
        .count();
    assert_eq!(failed, count);
}

#[then(expr = "there are {int} transactions")]
async fn transaction_count(world: &mut PaymentWorld, count: u64) {
    let page = world.system().transactions.transactions(&TransactionQuery::default()).await.expect("Query failed");
    assert_eq!(page.total, count);
}
