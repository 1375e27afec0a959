use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("No signing secret is configured for gateway requests")]
    MissingSigningSecret,
    #[error("Could not sign gateway request: {0}")]
    SigningError(String),
    #[error("The gateway did not respond in time")]
    Timeout,
    #[error("Could not reach the gateway: {0}")]
    NetworkError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The gateway returned an unusable response: {0}")]
    InvalidResponse(String),
}

impl GatewayApiError {
    /// Whether a repeat of the same request could reasonably succeed.
    ///
    /// Timeouts, connection failures, 5xx responses and rate limiting (429) are transient. Any other 4xx means the
    /// request itself was rejected and will be rejected again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::NetworkError(_) => true,
            Self::QueryError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
