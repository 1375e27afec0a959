#![allow(dead_code)]
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use gateway_tools::RequestSigner;
use log::*;
use school_payment_engine::{
    db_types::{OrderId, OrderStatus, StudentInfo},
    events::EventProducers,
    helpers::RetryPolicy,
    order_objects::NewPaymentRequest,
    test_utils::{
        fakes::{FakeGateway, ManualClock},
        prepare_env::{drop_database, prepare_test_env, random_db_path},
    },
    OrderFlowApi,
    OrderManagement,
    SqliteDatabase,
    StatusPollerApi,
    TransactionApi,
    WebhookApi,
};
use spg_common::{Amount, Secret};

pub const SIGNING_KEY: &str = "edvtest01";
pub const CALLBACK_URL: &str = "http://127.0.0.1:8360/webhook";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 23, 8, 0, 0).single().expect("valid timestamp")
}

pub struct TestSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub gateway: FakeGateway,
    pub clock: Arc<ManualClock>,
    pub orders: OrderFlowApi<SqliteDatabase, FakeGateway>,
    pub webhooks: WebhookApi<SqliteDatabase>,
    pub poller: StatusPollerApi<SqliteDatabase, FakeGateway>,
    pub transactions: TransactionApi<SqliteDatabase>,
}

impl std::fmt::Debug for TestSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TestSystem ({})", self.db_path)
    }
}

impl TestSystem {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        let db_path = random_db_path();
        prepare_test_env(&db_path).await;
        let db = SqliteDatabase::new_with_url(&db_path, 5).await.expect("Error creating connection to database");
        debug!("Created database: {db_path}");
        let gateway = FakeGateway::new();
        let clock = Arc::new(ManualClock::new(t0()));
        let signer = RequestSigner::new(Secret::from(SIGNING_KEY)).expect("signing key");
        let orders = OrderFlowApi::new(db.clone(), gateway.clone(), signer.clone(), CALLBACK_URL)
            .with_retry_policy(RetryPolicy::new(3, std::time::Duration::from_millis(1)))
            .with_clock(clock.clone());
        let webhooks = WebhookApi::new(db.clone(), producers.clone()).with_clock(clock.clone());
        let poller = StatusPollerApi::new(db.clone(), gateway.clone(), signer, producers).with_clock(clock.clone());
        let transactions = TransactionApi::new(db.clone());
        Self { db_path, db, gateway, clock, orders, webhooks, poller, transactions }
    }

    pub async fn create_order(&self, school_id: &str, amount: i64) -> OrderId {
        let created = self.orders.create_payment(payment_request(school_id, amount)).await.expect("order creation");
        created.order_id
    }

    pub async fn status(&self, order_id: &OrderId) -> OrderStatus {
        self.db.fetch_order_status(order_id).await.expect("store error").expect("order status is missing")
    }

    pub async fn tear_down(self) {
        self.db.close().await;
        drop_database(&self.db_path).await;
    }
}

pub fn payment_request(school_id: &str, amount: i64) -> NewPaymentRequest {
    NewPaymentRequest {
        school_id: school_id.to_string(),
        trustee_id: "trustee-01".to_string(),
        student_info: StudentInfo::new("Asha Rao", "STU-19", "asha@example.com"),
        gateway_name: "PhonePe".to_string(),
        order_amount: Amount::from_major(amount),
        payment_mode: "upi".to_string(),
    }
}

/// A webhook body in the canonical wire format.
pub fn webhook_body(order_id: &str, status: &str, amount: i64, payment_time: DateTime<Utc>) -> String {
    serde_json::json!({
        "status": 200,
        "order_info": {
            "order_id": order_id,
            "order_amount": amount,
            "transaction_amount": amount,
            "gateway": "PhonePe",
            "bank_reference": (if status == "success" { "YESBNK222" } else { "PENDING" }),
            "status": status,
            "payment_mode": "upi",
            "payment_details": (if status == "success" { "success@ybl" } else { "Pending" }),
            "payment_message": format!("payment {status}"),
            "payment_time": payment_time.to_rfc3339(),
            "error_message": "NA"
        }
    })
    .to_string()
}
