use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use gateway_tools::{GatewayApi, RequestSigner};
use log::*;
use school_payment_engine::{
    events::EventProducers,
    OrderFlowApi,
    SqliteDatabase,
    StatusPollerApi,
    TransactionApi,
    WebhookApi,
};

use crate::{
    alerts::create_alert_handlers,
    auth::TokenValidator,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    middleware::{HmacMiddlewareFactory, JwtMiddlewareFactory, WEBHOOK_SIGNATURE_HEADER},
    routes::{
        health,
        CreatePaymentRoute,
        NotificationsForReviewRoute,
        PaymentStatusRoute,
        TransactionStatusRoute,
        TransactionsForSchoolRoute,
        TransactionsRoute,
        WebhookRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = GatewayApi::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_alert_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(ServerError::IOError)
}

/// Rejects bodies that can't be parsed with the same JSON error shape as every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into())
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: GatewayApi,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let signer = RequestSigner::new(config.gateway.pg_key.clone())
        .map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
    let validator = TokenValidator::new(&config.auth);
    let options = ServerOptions::from_config(&config);
    if config.webhook.hmac_checks {
        info!("🔐️ Webhook signatures will be checked");
    }
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(
            db.clone(),
            gateway.clone(),
            signer.clone(),
            config.gateway.callback_url.clone(),
        )
        .with_retry_policy(config.retry);
        let poller_api = StatusPollerApi::new(db.clone(), gateway.clone(), signer.clone(), producers.clone());
        let webhook_api = WebhookApi::new(db.clone(), producers.clone());
        let transactions_api = TransactionApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("spg::access_log"))
            .app_data(json_config())
            .app_data(query_config())
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(poller_api))
            .app_data(web::Data::new(webhook_api))
            .app_data(web::Data::new(transactions_api))
            .app_data(web::Data::new(options));
        // Routes that require authentication
        let auth_scope = web::scope("/api")
            .wrap(JwtMiddlewareFactory::new(validator.clone()))
            .service(CreatePaymentRoute::<SqliteDatabase, GatewayApi>::new())
            .service(PaymentStatusRoute::<SqliteDatabase, GatewayApi>::new())
            .service(TransactionsForSchoolRoute::<SqliteDatabase>::new())
            .service(TransactionsRoute::<SqliteDatabase>::new())
            .service(TransactionStatusRoute::<SqliteDatabase>::new())
            .service(NotificationsForReviewRoute::<SqliteDatabase>::new());
        let webhook_scope = web::scope("/webhook")
            .wrap(HmacMiddlewareFactory::new(
                WEBHOOK_SIGNATURE_HEADER,
                config.webhook.hmac_secret.clone(),
                config.webhook.hmac_checks,
            ))
            .service(WebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(auth_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
