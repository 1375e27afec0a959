use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use actix_web::{http::StatusCode, test::TestRequest, web};
use gateway_tools::GatewayApiError;
use school_payment_engine::{
    db_types::{OrderId, PaymentStatus},
    events::EventProducers,
    traits::OrderManagement,
    OrderFlowApi,
    SqliteDatabase,
    StatusPollerApi,
};
use serde_json::json;

use super::{
    helpers::{bearer, jwt, no_retries, payment_request, seed_order, send, signer, TestDb, CALLBACK_URL},
    mocks::{collect_response, status_response, MockGateway},
};
use crate::{
    auth::Role,
    routes::{CreatePaymentRoute, PaymentStatusRoute},
};

type OrdersApi = OrderFlowApi<SqliteDatabase, MockGateway>;
type PollerApi = StatusPollerApi<SqliteDatabase, MockGateway>;

fn create_payment_request(body: serde_json::Value) -> TestRequest {
    TestRequest::post().uri("/api/create-payment").insert_header(bearer(Role::User)).set_json(body)
}

fn orders_service(api: web::Data<OrdersApi>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(api)
            .service(web::scope("/api").wrap(jwt()).service(CreatePaymentRoute::<SqliteDatabase, MockGateway>::new()));
    }
}

fn poller_service(api: web::Data<PollerApi>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(api)
            .service(web::scope("/api").wrap(jwt()).service(PaymentStatusRoute::<SqliteDatabase, MockGateway>::new()));
    }
}

#[actix_web::test]
async fn create_payment() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let mut gateway = MockGateway::new();
    gateway.expect_create_collection_request().times(1).returning(|_| Ok(collect_response("CR_6644ab")));
    let api = web::Data::new(OrderFlowApi::new(test_db.db.clone(), gateway, signer(), CALLBACK_URL));

    let req = create_payment_request(payment_request("65b0e6293e9f76a9694d84b4", 2500));
    let (status, body) = send(req, orders_service(api)).await;
    assert_eq!(status, StatusCode::OK);
    let order_id = body["order_id"].as_str().expect("order_id");
    assert!(order_id.starts_with("ORD_"));
    assert_eq!(body["collect_request_id"], "CR_6644ab");
    assert_eq!(body["payment_url"], "https://pay.example.com/collect/CR_6644ab");

    let stored = test_db.db.fetch_order_status(&OrderId::from(order_id)).await.unwrap().expect("status record");
    assert_eq!(stored.status, PaymentStatus::Pending);
    assert_eq!(stored.gateway_request_id.as_deref(), Some("CR_6644ab"));
    test_db.tear_down().await;
}

#[actix_web::test]
async fn create_payment_needs_a_token() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let mut gateway = MockGateway::new();
    gateway.expect_create_collection_request().times(0);
    let api = web::Data::new(OrderFlowApi::new(test_db.db.clone(), gateway, signer(), CALLBACK_URL));

    let req = TestRequest::post().uri("/api/create-payment").set_json(payment_request("school-a", 2500));
    let (status, body) = send(req, orders_service(api)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
    test_db.tear_down().await;
}

#[actix_web::test]
async fn create_payment_rejects_invalid_requests() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let mut gateway = MockGateway::new();
    gateway.expect_create_collection_request().times(0);
    let api = web::Data::new(OrderFlowApi::new(test_db.db.clone(), gateway, signer(), CALLBACK_URL));

    let mut request = payment_request("school-a", 2500);
    request["student_info"]["email"] = json!("not-an-email");
    let (status, body) = send(create_payment_request(request), orders_service(api.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("email"));

    let req = TestRequest::post()
        .uri("/api/create-payment")
        .insert_header(bearer(Role::User))
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"school_id\": \"school-a\", ");
    let (status, body) = send(req, orders_service(api)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    test_db.tear_down().await;
}

#[actix_web::test]
async fn create_payment_when_gateway_is_down() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_collection_request()
        .times(1)
        .returning(|_| Err(GatewayApiError::QueryError { status: 503, message: "maintenance".into() }));
    let api = OrderFlowApi::new(test_db.db.clone(), gateway, signer(), CALLBACK_URL).with_retry_policy(no_retries());
    let api = web::Data::new(api);

    let req = create_payment_request(payment_request("school-a", 2500));
    let (status, body) = send(req, orders_service(api)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let order_id = body["order_id"].as_str().expect("the order id is reported");
    let stored = test_db.db.fetch_order_status(&OrderId::from(order_id)).await.unwrap().expect("order was kept");
    assert_eq!(stored.status, PaymentStatus::Pending);
    assert!(stored.gateway_request_id.is_none());
    test_db.tear_down().await;
}

#[actix_web::test]
async fn payment_status() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let order_id = seed_order(&test_db.db, "school-a", 1500).await;
    let mut gateway = MockGateway::new();
    gateway.expect_query_status().times(1).returning(|_| Ok(status_response("SUCCESS")));
    let api = web::Data::new(StatusPollerApi::new(test_db.db.clone(), gateway, signer(), EventProducers::default()));

    let req = TestRequest::get()
        .uri(&format!("/api/payment-status/{order_id}"))
        .insert_header(bearer(Role::User));
    let (status, body) = send(req, poller_service(api)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order_id"], order_id.as_str());
    assert_eq!(body["status"], "success");
    assert_eq!(body["source_of_last_update"], "poll");
    test_db.tear_down().await;
}

#[actix_web::test]
async fn payment_status_for_unknown_order() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let mut gateway = MockGateway::new();
    gateway.expect_query_status().times(0);
    let api = web::Data::new(StatusPollerApi::new(test_db.db.clone(), gateway, signer(), EventProducers::default()));

    let req = TestRequest::get().uri("/api/payment-status/ORD_1_nothere").insert_header(bearer(Role::User));
    let (status, body) = send(req, poller_service(api)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
    test_db.tear_down().await;
}

#[actix_web::test]
async fn poll_cannot_overturn_a_terminal_status() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let order_id = seed_order(&test_db.db, "school-a", 1500).await;
    let calls = Arc::new(AtomicUsize::new(0));
    let mut gateway = MockGateway::new();
    let counter = Arc::clone(&calls);
    gateway.expect_query_status().times(2).returning(move |_| {
        let status = if counter.fetch_add(1, Ordering::SeqCst) == 0 { "SUCCESS" } else { "FAILED" };
        Ok(status_response(status))
    });
    let api = web::Data::new(StatusPollerApi::new(test_db.db.clone(), gateway, signer(), EventProducers::default()));

    let uri = format!("/api/payment-status/{order_id}");
    let req = TestRequest::get().uri(&uri).insert_header(bearer(Role::User));
    let (status, _) = send(req, poller_service(api.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let req = TestRequest::get().uri(&uri).insert_header(bearer(Role::User));
    let (status, body) = send(req, poller_service(api)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("manual review"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let stored = test_db.db.fetch_order_status(&order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Success);
    test_db.tear_down().await;
}
