use actix_web::{http::StatusCode, test::TestRequest, web};
use chrono::{Duration, Utc};
use school_payment_engine::{events::EventProducers, SqliteDatabase, TransactionApi, WebhookApi};
use serde_json::Value;

use super::helpers::{bearer, jwt, seed_order, send, webhook_body, TestDb};
use crate::{
    auth::Role,
    routes::{NotificationsForReviewRoute, TransactionStatusRoute, TransactionsForSchoolRoute, TransactionsRoute},
};

fn transactions_service(api: web::Data<TransactionApi<SqliteDatabase>>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(api).service(
            web::scope("/api")
                .wrap(jwt())
                .service(TransactionsForSchoolRoute::<SqliteDatabase>::new())
                .service(TransactionsRoute::<SqliteDatabase>::new())
                .service(TransactionStatusRoute::<SqliteDatabase>::new()),
        );
    }
}

fn review_service(api: web::Data<WebhookApi<SqliteDatabase>>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(api)
            .service(web::scope("/api").wrap(jwt()).service(NotificationsForReviewRoute::<SqliteDatabase>::new()));
    }
}

async fn get(api: &web::Data<TransactionApi<SqliteDatabase>>, uri: &str) -> (StatusCode, Value) {
    let req = TestRequest::get().uri(uri).insert_header(bearer(Role::User));
    send(req, transactions_service(api.clone())).await
}

async fn seed_schools(db: &SqliteDatabase) {
    for amount in [1000, 2000, 3000] {
        seed_order(db, "school-a", amount).await;
    }
    for amount in [4000, 5000] {
        seed_order(db, "school-b", amount).await;
    }
}

#[actix_web::test]
async fn transactions_are_paginated() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    seed_schools(&test_db.db).await;
    let api = web::Data::new(TransactionApi::new(test_db.db.clone()));

    let (status, body) = get(&api, "/api/transactions?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 5);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let (status, body) = get(&api, "/api/transactions?limit=2&page=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (status, body) = get(&api, "/api/transactions?sort=order_amount&order=asc").await;
    assert_eq!(status, StatusCode::OK);
    let amounts = body["items"].as_array().unwrap().iter().map(|i| i["order_amount"].clone()).collect::<Vec<_>>();
    let mut sorted = amounts.clone();
    sorted.sort_by_key(|v| v.as_i64());
    assert_eq!(amounts, sorted);
    test_db.tear_down().await;
}

#[actix_web::test]
async fn transactions_are_filtered_by_school() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    seed_schools(&test_db.db).await;
    let api = web::Data::new(TransactionApi::new(test_db.db.clone()));

    let (status, body) = get(&api, "/api/transactions/school/school-b").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert!(body["items"].as_array().unwrap().iter().all(|i| i["school_id"] == "school-b"));

    // the path wins over the query string
    let (_, body) = get(&api, "/api/transactions/school/school-b?school_id=school-a").await;
    assert_eq!(body["total"], 2);

    let (status, body) = get(&api, "/api/transactions?schoolId=school-a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);

    let (_, body) = get(&api, "/api/transactions?status=success").await;
    assert_eq!(body["total"], 0);
    test_db.tear_down().await;
}

#[actix_web::test]
async fn transactions_reject_bad_queries() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let api = web::Data::new(TransactionApi::new(test_db.db.clone()));

    let (status, body) = get(&api, "/api/transactions?limit=500").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("limit"));

    let (status, _) = get(&api, "/api/transactions?status=refunded").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&api, "/api/transactions?page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    test_db.tear_down().await;
}

#[actix_web::test]
async fn transaction_status() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let order_id = seed_order(&test_db.db, "school-a", 1200).await;
    let api = web::Data::new(TransactionApi::new(test_db.db.clone()));

    let (status, body) = get(&api, &format!("/api/transaction-status/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order_id"], order_id.as_str());
    assert_eq!(body["status"], "pending");
    assert_eq!(body["school_id"], "school-a");

    let (status, _) = get(&api, "/api/transaction-status/ORD_1_missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&api, "/api/transaction-status/not%20valid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    test_db.tear_down().await;
}

#[actix_web::test]
async fn only_admins_see_notifications_for_review() {
    let _ = env_logger::try_init();
    let test_db = TestDb::new().await;
    let api = web::Data::new(WebhookApi::new(test_db.db.clone(), EventProducers::default()));

    let req = TestRequest::get().uri("/api/notifications/review").insert_header(bearer(Role::User));
    let (status, body) = send(req, review_service(api.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("admin"));

    let req = TestRequest::get().uri("/api/notifications/review").insert_header(bearer(Role::Admin));
    let (status, body) = send(req, review_service(api.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));

    let order_id = seed_order(&test_db.db, "school-a", 800).await;
    let now = Utc::now();
    let receipt = api.ingest(&webhook_body(order_id.as_str(), "SUCCESS", 800, now), None).await.unwrap();
    assert!(receipt.accepted);
    let body = webhook_body(order_id.as_str(), "FAILED", 800, now + Duration::seconds(5));
    let receipt = api.ingest(&body, None).await.unwrap();
    assert!(!receipt.accepted);

    let req = TestRequest::get().uri("/api/notifications/review").insert_header(bearer(Role::Admin));
    let (status, body) = send(req, review_service(api)).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["notification_id"], receipt.notification_id.as_str());
    test_db.tear_down().await;
}
