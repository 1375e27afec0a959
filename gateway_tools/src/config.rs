use std::time::Duration;

use log::*;
use spg_common::Secret;

use crate::GatewayApiError;

/// Outbound calls to the gateway are never allowed to hang for longer than this.
pub const MAX_GATEWAY_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_API_URL: &str = "https://dev-vanilla.edviron.com/erp";
const DEFAULT_CALLBACK_URL: &str = "http://127.0.0.1:8360/webhook";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway API, without a trailing slash
    pub api_url: String,
    /// Sent as a bearer token on every request
    pub api_key: Secret<String>,
    /// Shared secret used to sign request parameters
    pub pg_key: Secret<String>,
    /// Where the gateway should redirect the payer once the payment completes
    pub callback_url: String,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: Secret::default(),
            pg_key: Secret::default(),
            callback_url: DEFAULT_CALLBACK_URL.to_string(),
            timeout: MAX_GATEWAY_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    /// Loads the gateway configuration from the `SPG_GATEWAY_*` environment variables.
    ///
    /// Fails if `SPG_GATEWAY_PG_KEY` is missing or blank, since no request can be signed without it.
    pub fn try_from_env() -> Result<Self, GatewayApiError> {
        let api_url = std::env::var("SPG_GATEWAY_API_URL").unwrap_or_else(|_| {
            warn!("🪛️ SPG_GATEWAY_API_URL not set, using {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });
        let api_key = Secret::new(std::env::var("SPG_GATEWAY_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ SPG_GATEWAY_API_KEY not set. Requests to the gateway will most likely be rejected.");
            String::default()
        }));
        let pg_key = Secret::new(std::env::var("SPG_GATEWAY_PG_KEY").unwrap_or_default());
        if pg_key.is_blank() {
            return Err(GatewayApiError::MissingSigningSecret);
        }
        let callback_url = std::env::var("SPG_CALLBACK_URL").unwrap_or_else(|_| {
            warn!("🪛️ SPG_CALLBACK_URL not set, using {DEFAULT_CALLBACK_URL}");
            DEFAULT_CALLBACK_URL.to_string()
        });
        let timeout = std::env::var("SPG_GATEWAY_TIMEOUT_MS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid value for SPG_GATEWAY_TIMEOUT_MS: {s}. {e}"))
                    .ok()
            })
            .map(Duration::from_millis)
            .unwrap_or(MAX_GATEWAY_TIMEOUT);
        let api_url = api_url.trim_end_matches('/').to_string();
        let config = Self { api_url, api_key, pg_key, callback_url, timeout };
        Ok(config.with_timeout(timeout))
    }

    /// Sets the request timeout, capped at [`MAX_GATEWAY_TIMEOUT`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if timeout > MAX_GATEWAY_TIMEOUT {
            warn!(
                "🪛️ Gateway timeout of {}ms exceeds the maximum. Using {}ms",
                timeout.as_millis(),
                MAX_GATEWAY_TIMEOUT.as_millis()
            );
        }
        self.timeout = timeout.min(MAX_GATEWAY_TIMEOUT);
        self
    }
}
