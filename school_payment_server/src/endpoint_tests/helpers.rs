use actix_web::{
    body::to_bytes,
    dev::ServiceResponse,
    http::{header::AUTHORIZATION, StatusCode},
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::{DateTime, SecondsFormat, Utc};
use gateway_tools::RequestSigner;
use log::debug;
use school_payment_engine::{
    db_types::OrderId,
    helpers::RetryPolicy,
    order_objects::NewPaymentRequest,
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    OrderFlowApi,
    SqliteDatabase,
};
use serde_json::{json, Value};
use spg_common::Secret;

use super::mocks::{collect_response, MockGateway};
use crate::{
    auth::{test_tokens::valid_token, Role, TokenValidator},
    config::AuthConfig,
    middleware::JwtMiddlewareFactory,
    server::{json_config, query_config},
};

pub const SIGNING_KEY: &str = "edvtest01";
pub const CALLBACK_URL: &str = "http://127.0.0.1:8360/webhook";

pub struct TestDb {
    pub path: String,
    pub db: SqliteDatabase,
}

impl TestDb {
    pub async fn new() -> Self {
        let path = random_db_path();
        prepare_test_env(&path).await;
        let db = SqliteDatabase::new_with_url(&path, 5).await.expect("Error creating connection to database");
        Self { path, db }
    }

    pub async fn tear_down(self) {
        self.db.close().await;
        drop_database(&self.path).await;
    }
}

pub fn signer() -> RequestSigner {
    RequestSigner::new(Secret::from(SIGNING_KEY)).expect("signing key")
}

pub fn jwt() -> JwtMiddlewareFactory {
    JwtMiddlewareFactory::new(TokenValidator::new(&AuthConfig::new(crate::auth::test_tokens::TEST_JWT_SECRET)))
}

pub fn bearer(role: Role) -> (actix_web::http::header::HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {}", valid_token(role)))
}

pub fn payment_request(school_id: &str, amount: i64) -> Value {
    json!({
        "school_id": school_id,
        "trustee_id": "65b0e552dd31950a9b41c5ba",
        "student_info": { "name": "Asha Rao", "id": "STU-19", "email": "asha@example.com" },
        "gateway_name": "PhonePe",
        "order_amount": amount,
        "payment_mode": "upi"
    })
}

pub fn webhook_body(order_id: &str, status: &str, amount: i64, at: DateTime<Utc>) -> String {
    json!({
        "status": 200,
        "order_info": {
            "order_id": order_id,
            "order_amount": amount,
            "transaction_amount": amount,
            "gateway": "PhonePe",
            "bank_reference": "YESBNK222",
            "status": status,
            "payment_mode": "upi",
            "payment_details": "success@ybl",
            "payment_message": format!("payment {status}"),
            "payment_time": at.to_rfc3339_opts(SecondsFormat::Millis, true),
            "error_message": "NA"
        }
    })
    .to_string()
}

/// Stores an order directly through the engine, with a gateway that always hands out a collection request.
pub async fn seed_order(db: &SqliteDatabase, school_id: &str, amount: i64) -> OrderId {
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_collection_request()
        .returning(|_| Ok(collect_response(&format!("CR_{:08x}", rand::random::<u32>()))));
    let api = OrderFlowApi::new(db.clone(), gateway, signer(), CALLBACK_URL);
    let request: NewPaymentRequest = serde_json::from_value(payment_request(school_id, amount)).expect("request");
    api.create_payment(request).await.expect("order creation").order_id
}

pub fn no_retries() -> RetryPolicy {
    RetryPolicy::no_retries()
}

/// Sends the request through an app built by `configure` and returns the status code and the JSON body (or
/// `Value::Null` if the body is not JSON).
///
/// Errors raised by middleware are turned into responses the same way the server does.
pub async fn send<F>(req: TestRequest, configure: F) -> (StatusCode, Value)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().app_data(json_config()).app_data(query_config()).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (status, body) = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => read_response(res).await,
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            (status, to_bytes(res.into_body()).await.unwrap_or_default())
        },
    };
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn read_response<B>(res: ServiceResponse<B>) -> (StatusCode, actix_web::web::Bytes)
where B: actix_web::body::MessageBody {
    let status = res.status();
    (status, test::read_body(res).await)
}
