use serde::{Deserialize, Serialize};
use spg_common::Amount;

/// The parameters of a new collection request, before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRequest {
    pub school_id: String,
    pub amount: Amount,
    pub callback_url: String,
}

impl CollectionRequest {
    pub fn new<S: Into<String>, C: Into<String>>(school_id: S, amount: Amount, callback_url: C) -> Self {
        Self { school_id: school_id.into(), amount, callback_url: callback_url.into() }
    }
}

/// A collection request as it goes over the wire: the request parameters plus `sign`, a short-lived token over them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCollectionRequest {
    #[serde(flatten)]
    pub request: CollectionRequest,
    pub sign: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRequestResponse {
    pub collect_request_id: String,
    #[serde(alias = "Collect_request_url")]
    pub collect_request_url: String,
}

/// Parameters for a status query against an existing collection request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusQuery {
    /// The gateway's collection request id, or our own order id if the gateway never assigned one.
    pub collect_request_id: String,
    pub school_id: String,
    pub sign: String,
}

/// The gateway's view of a collection request. Everything except `status` is optional; gateways are frugal with
/// what they report for payments that haven't completed yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStatusResponse {
    pub status: String,
    pub amount: Option<Amount>,
    pub transaction_amount: Option<Amount>,
    pub payment_mode: Option<String>,
    pub payment_details: Option<String>,
    pub bank_reference: Option<String>,
    pub message: Option<String>,
}
