//! Client for the upstream payment gateway.
//!
//! The gateway exposes two calls that this crate cares about: creating a *collection request* (which hands back a
//! hosted payment page URL) and querying the status of an existing collection request. Every request carries a signed
//! HS256 token over its parameters, produced by [`RequestSigner`].
//!
//! [`GatewayApi`] does no retrying of its own; callers decide which [`GatewayApiError`]s are worth retrying via
//! [`GatewayApiError::is_transient`].
mod api;
mod config;
mod error;
mod signing;

mod data_objects;

pub use api::{GatewayApi, PaymentGateway};
pub use config::{GatewayConfig, MAX_GATEWAY_TIMEOUT};
pub use data_objects::{
    CollectionRequest,
    CollectionRequestResponse,
    CollectionStatusResponse,
    SignedCollectionRequest,
    StatusQuery,
};
pub use error::GatewayApiError;
pub use signing::{RequestSigner, SIGNATURE_VALIDITY};
