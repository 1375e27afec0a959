//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, gateway calls, etc.) should be
//! expressed as futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus
//! don’t block execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use gateway_tools::PaymentGateway;
use log::*;
use school_payment_engine::{
    db_types::OrderId,
    order_objects::{NewPaymentRequest, TransactionQuery, TransactionQueryParams},
    traits::{NotificationLog, OrderManagement, TransactionQueries},
    validation::validate_order_reference,
    OrderFlowApi,
    StatusPollerApi,
    TransactionApi,
    WebhookApi,
};
use serde_json::json;

use crate::{auth::Role, config::ServerOptions, errors::ServerError, helpers::get_remote_ip};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$role:expr])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new($role));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where public)  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().json(json!({ "status": "healthy" }))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(create_payment => Post "/create-payment" impl OrderManagement, PaymentGateway);
/// Route handler for the create-payment endpoint
///
/// Validates the request, stores the order with a `pending` status and asks the payment gateway for a collection
/// request. The response carries our `order_id` and the URL of the gateway's hosted payment page.
///
/// If the gateway cannot be reached, the order is still stored and the 502 response includes its `order_id`, so that
/// the client can check on it later.
pub async fn create_payment<B, G>(
    body: web::Json<NewPaymentRequest>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement,
    G: PaymentGateway,
{
    let request = body.into_inner();
    debug!("💻️ POST create-payment for school {}", request.school_id);
    request.validate()?;
    let payment = api.create_payment(request).await?;
    Ok(HttpResponse::Ok().json(payment))
}

route!(payment_status => Get "/payment-status/{order_id}" impl OrderManagement, PaymentGateway);
/// Route handler for the payment-status endpoint
///
/// Asks the gateway for the current state of the payment, reconciles the answer with what we have stored, and returns
/// the resulting snapshot. A poll can never undo a terminal outcome that was already recorded.
pub async fn payment_status<B, G>(
    path: web::Path<String>,
    api: web::Data<StatusPollerApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement,
    G: PaymentGateway,
{
    let reference = path.into_inner();
    debug!("💻️ GET payment-status for {reference}");
    validate_order_reference(&reference)?;
    let status = api.poll(&reference).await?;
    Ok(HttpResponse::Ok().json(status))
}

//----------------------------------------------   Transactions  ----------------------------------------------------
route!(transactions => Get "/transactions" impl TransactionQueries);
/// Route handler for the transactions endpoint
///
/// A filtered, sorted and paginated listing of every order with its current status. See [`TransactionQueryParams`]
/// for the supported query parameters.
pub async fn transactions<B: TransactionQueries>(
    query: web::Query<TransactionQueryParams>,
    api: web::Data<TransactionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = TransactionQuery::try_from(query.into_inner())?;
    debug!("💻️ GET transactions. page {} (limit {})", query.page, query.limit);
    let page = api.transactions(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

route!(transactions_for_school => Get "/transactions/school/{school_id}" impl TransactionQueries);
/// Route handler for the transactions/school/{school_id} endpoint
///
/// The same listing as `/transactions`, restricted to a single school. A `school_id` in the query string is ignored.
pub async fn transactions_for_school<B: TransactionQueries>(
    path: web::Path<String>,
    query: web::Query<TransactionQueryParams>,
    api: web::Data<TransactionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let school_id = path.into_inner();
    debug!("💻️ GET transactions for school {school_id}");
    let mut params = query.into_inner();
    params.school_id = Some(school_id);
    let query = TransactionQuery::try_from(params)?;
    let page = api.transactions(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

route!(transaction_status => Get "/transaction-status/{order_id}" impl TransactionQueries);
/// Route handler for the transaction-status endpoint
///
/// Returns the stored snapshot of a single order. Unlike `/payment-status`, this never contacts the gateway.
pub async fn transaction_status<B: TransactionQueries>(
    path: web::Path<String>,
    api: web::Data<TransactionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET transaction-status for {order_id}");
    validate_order_reference(&order_id)?;
    let record = api.transaction(&OrderId::from(order_id)).await?;
    Ok(HttpResponse::Ok().json(record))
}

//----------------------------------------------   Notifications  ----------------------------------------------------
route!(
    notifications_for_review => Get "/notifications/review" impl OrderManagement, NotificationLog
    where requires [Role::Admin]
);
/// Route handler for the notifications/review endpoint
///
/// Admins can fetch the gateway notifications that contradicted an already-terminal payment outcome. These are never
/// applied automatically.
pub async fn notifications_for_review<B>(api: web::Data<WebhookApi<B>>) -> Result<HttpResponse, ServerError>
where B: OrderManagement + NotificationLog {
    debug!("💻️ GET notifications for review");
    let entries = api.notifications_for_review().await?;
    Ok(HttpResponse::Ok().json(entries))
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(webhook => Post "" impl OrderManagement, NotificationLog where public);
/// Route handler for the payment gateway's webhook. Mounted at `/webhook`, behind the optional HMAC check.
///
/// The raw body is logged before anything else happens to it. A 200 response means that the notification was
/// recorded and reconciled; the `accepted` field of the receipt says whether it changed (or confirmed) the stored
/// status. Reports that were rejected as stale or conflicting also get a 200, so that the gateway stops redelivering
/// them.
pub async fn webhook<B>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<WebhookApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + NotificationLog,
{
    let remote_addr = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded).map(|ip| ip.to_string());
    trace!("💻️ Received webhook from {remote_addr:?}");
    let receipt = api.ingest_bytes(&body, remote_addr).await?;
    info!(
        "💻️ Webhook {} for {} processed. Accepted: {}",
        receipt.notification_id,
        receipt.order_id.as_ref().map(|id| id.as_str()).unwrap_or("?"),
        receipt.accepted
    );
    Ok(HttpResponse::Ok().json(receipt))
}
