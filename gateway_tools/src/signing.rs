use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use spg_common::Secret;

use crate::{CollectionRequest, GatewayApiError, SignedCollectionRequest, StatusQuery};

/// How long a request signature stays valid after it is issued.
pub const SIGNATURE_VALIDITY: Duration = Duration::from_secs(300);

#[derive(Debug, Serialize, Deserialize)]
pub struct SignedClaims<T> {
    #[serde(flatten)]
    pub payload: T,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct StatusClaims {
    school_id: String,
    collect_request_id: String,
}

/// Produces the `sign` parameter the gateway expects on every request: an HS256 token over the request parameters,
/// keyed with the PG secret.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    key: Secret<String>,
}

impl RequestSigner {
    /// Refuses to build a signer without a secret. Unsigned (or empty-key-signed) requests are never sent.
    pub fn new(key: Secret<String>) -> Result<Self, GatewayApiError> {
        if key.is_blank() {
            return Err(GatewayApiError::MissingSigningSecret);
        }
        Ok(Self { key })
    }

    pub fn sign_collection_request(
        &self,
        request: CollectionRequest,
    ) -> Result<SignedCollectionRequest, GatewayApiError> {
        let sign = self.sign(&request)?;
        Ok(SignedCollectionRequest { request, sign })
    }

    pub fn sign_status_query(&self, collect_request_id: &str, school_id: &str) -> Result<StatusQuery, GatewayApiError> {
        let claims =
            StatusClaims { school_id: school_id.to_string(), collect_request_id: collect_request_id.to_string() };
        let sign = self.sign(&claims)?;
        Ok(StatusQuery { collect_request_id: claims.collect_request_id, school_id: claims.school_id, sign })
    }

    pub fn sign<T: Serialize>(&self, payload: &T) -> Result<String, GatewayApiError> {
        let iat = Utc::now().timestamp();
        #[allow(clippy::cast_possible_wrap)]
        let exp = iat + SIGNATURE_VALIDITY.as_secs() as i64;
        let claims = SignedClaims { payload, iat, exp };
        let key = EncodingKey::from_secret(self.key.reveal().as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &key).map_err(|e| GatewayApiError::SigningError(e.to_string()))
    }

    /// Checks a signature produced by this signer (or anyone holding the same secret) and returns its claims.
    /// Expired tokens are rejected.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<SignedClaims<T>, GatewayApiError> {
        let key = DecodingKey::from_secret(self.key.reveal().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<SignedClaims<T>>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| GatewayApiError::SigningError(e.to_string()))
    }
}
