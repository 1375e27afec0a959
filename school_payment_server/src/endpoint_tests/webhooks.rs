use actix_web::{http::StatusCode, test::TestRequest, web};
use chrono::{Duration, Utc};
use school_payment_engine::{
    db_types::{PaymentStatus, ProcessingState},
    events::EventProducers,
    traits::{NotificationLog, OrderManagement},
    SqliteDatabase,
    WebhookApi,
};
use spg_common::Secret;

use super::helpers::{seed_order, send, webhook_body, TestDb};
use crate::{
    config::ServerOptions,
    helpers::calculate_hmac,
    middleware::{HmacMiddlewareFactory, WEBHOOK_SIGNATURE_HEADER},
    routes::WebhookRoute,
};

const HMAC_SECRET: &str = "gateway-webhook-secret";

fn webhook_service(
    api: web::Data<WebhookApi<SqliteDatabase>>,
    hmac_checks: bool,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(api).app_data(web::Data::new(ServerOptions::default())).service(
            web::scope("/webhook")
                .wrap(HmacMiddlewareFactory::new(WEBHOOK_SIGNATURE_HEADER, Secret::from(HMAC_SECRET), hmac_checks))
                .service(WebhookRoute::<SqliteDatabase>::new()),
        );
    }
}

fn webhook_request(body: String) -> TestRequest {
    TestRequest::post().uri("/webhook").insert_header(("content-type", "application/json")).set_payload(body)
}

fn webhook_api(db: &SqliteDatabase) -> web::Data<WebhookApi<SqliteDatabase>> {
    web::Data::new(WebhookApi::new(db.clone(), EventProducers::default()))
}

#[actix_web::test]
async fn successful_payment_notification() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let order_id = seed_order(&test_db.db, "school-a", 2500).await;
    let api = webhook_api(&test_db.db);

    let req = webhook_request(webhook_body(order_id.as_str(), "SUCCESS", 2500, Utc::now()));
    let (status, body) = send(req, webhook_service(api, false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], true);
    assert_eq!(body["order_id"], order_id.as_str());
    assert_eq!(body["status"], "success");

    let stored = test_db.db.fetch_order_status(&order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Success);
    assert_eq!(stored.bank_reference, "YESBNK222");
    let entry = test_db.db.fetch_notification(body["notification_id"].as_str().unwrap()).await.unwrap().unwrap();
    assert_eq!(entry.processing_state, ProcessingState::Completed);
    test_db.tear_down().await;
}

#[actix_web::test]
async fn malformed_notification_is_logged_and_rejected() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let api = webhook_api(&test_db.db);

    let (status, body) = send(webhook_request("{\"order_info\": 42}".into()), webhook_service(api, false)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Malformed notification"));
    test_db.tear_down().await;
}

#[actix_web::test]
async fn notification_that_is_not_utf8() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let order_id = seed_order(&test_db.db, "school-a", 2500).await;
    let api = webhook_api(&test_db.db);

    let mut body = webhook_body(order_id.as_str(), "SUCCESS", 2500, Utc::now()).into_bytes();
    body.extend_from_slice(&[0xff, 0xfe]);
    let req = TestRequest::post().uri("/webhook").insert_header(("content-type", "application/json")).set_payload(body);
    let (status, body) = send(req, webhook_service(api, false)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("UTF-8"));

    let stored = test_db.db.fetch_order_status(&order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Pending);
    test_db.tear_down().await;
}

#[actix_web::test]
async fn notification_for_unknown_order() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let api = webhook_api(&test_db.db);

    let req = webhook_request(webhook_body("ORD_1745395200000_nosuchord", "SUCCESS", 100, Utc::now()));
    let (status, _) = send(req, webhook_service(api, false)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    test_db.tear_down().await;
}

#[actix_web::test]
async fn stale_notification_is_acknowledged_but_not_applied() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let order_id = seed_order(&test_db.db, "school-a", 2500).await;
    let api = webhook_api(&test_db.db);
    let now = Utc::now();

    let req = webhook_request(webhook_body(order_id.as_str(), "SUCCESS", 2500, now));
    let (status, _) = send(req, webhook_service(api.clone(), false)).await;
    assert_eq!(status, StatusCode::OK);

    let req = webhook_request(webhook_body(order_id.as_str(), "PENDING", 2500, now + Duration::seconds(30)));
    let (status, body) = send(req, webhook_service(api, false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], false);
    assert_eq!(body["status"], "success");
    assert!(body["reason"].as_str().unwrap().starts_with("stale"));

    let stored = test_db.db.fetch_order_status(&order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Success);
    test_db.tear_down().await;
}

#[actix_web::test]
async fn signed_webhooks() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let order_id = seed_order(&test_db.db, "school-a", 2500).await;
    let api = webhook_api(&test_db.db);
    let body = webhook_body(order_id.as_str(), "SUCCESS", 2500, Utc::now());

    let (status, err) = send(webhook_request(body.clone()), webhook_service(api.clone(), true)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(err["error"].as_str().unwrap().contains("signature"));

    let req = webhook_request(body.clone()).insert_header((WEBHOOK_SIGNATURE_HEADER, "bm90IGEgc2lnbmF0dXJl"));
    let (status, _) = send(req, webhook_service(api.clone(), true)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let stored = test_db.db.fetch_order_status(&order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Pending);

    let signature = calculate_hmac(HMAC_SECRET, body.as_bytes()).unwrap();
    let req = webhook_request(body).insert_header((WEBHOOK_SIGNATURE_HEADER, signature));
    let (status, receipt) = send(req, webhook_service(api, true)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["accepted"], true);
    test_db.tear_down().await;
}
