use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use school_payment_engine::{db_types::OrderId, PaymentEngineError, StoreError, ValidationError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("{0}")]
    ValidationError(#[from] ValidationError),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}")]
    GatewayUnavailable { order_id: Option<OrderId>, message: String },
    #[error("{0}")]
    IntegrityAnomaly(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
            },
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::IntegrityAnomaly(_) => StatusCode::CONFLICT,
            Self::GatewayUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::GatewayUnavailable { order_id: Some(order_id), message } => {
                json!({ "error": message, "order_id": order_id })
            },
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided. Send it as a bearer token in the Authorization header.")]
    MissingToken,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Request signature is invalid. {0}")]
    InvalidSignature(String),
}

impl From<PaymentEngineError> for ServerError {
    fn from(e: PaymentEngineError) -> Self {
        match e {
            PaymentEngineError::ValidationError(e) => Self::ValidationError(e),
            PaymentEngineError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            PaymentEngineError::OrderAlreadyExists(_) => Self::Conflict(e.to_string()),
            PaymentEngineError::GatewayUnavailable { ref order_id, .. } => {
                Self::GatewayUnavailable { order_id: Some(order_id.clone()), message: e.to_string() }
            },
            PaymentEngineError::IntegrityAnomaly { .. } => Self::IntegrityAnomaly(e.to_string()),
            PaymentEngineError::MalformedNotification(_) => Self::InvalidRequestBody(e.to_string()),
            PaymentEngineError::StoreError(StoreError::NotificationNotFound(_)) => Self::NoRecordFound(e.to_string()),
            PaymentEngineError::ConcurrencyConflict(_)
            | PaymentEngineError::SigningError(_)
            | PaymentEngineError::StoreError(_) => {
                error!("💻️ Unexpected engine error. {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}
