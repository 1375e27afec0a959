use std::{env, time::Duration};

use gateway_tools::GatewayConfig;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use school_payment_engine::helpers::RetryPolicy;
use spg_common::{helpers::env_flag, Secret};

use crate::errors::ServerError;

const DEFAULT_SPG_HOST: &str = "127.0.0.1";
const DEFAULT_SPG_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/school_payments.db";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    pub gateway: GatewayConfig,
    /// Retry policy for transient failures when asking the gateway for a collection request.
    pub retry: RetryPolicy,
    pub webhook: WebhookConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SPG_HOST.to_string(),
            port: DEFAULT_SPG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            gateway: GatewayConfig::default(),
            retry: RetryPolicy::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY),
            webhook: WebhookConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

fn env_number<T: std::str::FromStr>(name: &str, default: T) -> T
where T::Err: std::fmt::Display {
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default instead.");
            default
        }),
        Err(_) => default,
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    /// Loads the configuration from `SPG_*` environment variables, falling back to defaults where that is safe.
    ///
    /// Fails if the gateway signing secret (`SPG_GATEWAY_PG_KEY`) is not configured, since the server cannot create a
    /// single payment without it.
    pub fn try_from_env() -> Result<Self, ServerError> {
        let host = env::var("SPG_HOST").ok().unwrap_or_else(|| DEFAULT_SPG_HOST.into());
        let port = env_number("SPG_PORT", DEFAULT_SPG_PORT);
        let database_url = env::var("SPG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SPG_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!("🪛️ Could not load the authentication configuration. {e}. Reverting to the default configuration.");
            AuthConfig::default()
        });
        let gateway = GatewayConfig::try_from_env().map_err(|e| {
            ServerError::ConfigurationError(format!("{e}. Set SPG_GATEWAY_PG_KEY to the gateway's PG secret."))
        })?;
        let retry = configure_retry_policy();
        let webhook = WebhookConfig::from_env_or_defaults();
        let use_x_forwarded_for = env_flag("SPG_USE_X_FORWARDED_FOR", false);
        let use_forwarded = env_flag("SPG_USE_FORWARDED", false);
        Ok(Self { host, port, database_url, auth, gateway, retry, webhook, use_x_forwarded_for, use_forwarded })
    }
}

fn configure_retry_policy() -> RetryPolicy {
    let max_attempts = env_number("SPG_GATEWAY_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS);
    let delay = env::var("SPG_GATEWAY_RETRY_DELAY_MS")
        .map_err(|_| {
            info!(
                "🪛️ SPG_GATEWAY_RETRY_DELAY_MS is not set. Using the default value of {}ms.",
                DEFAULT_RETRY_DELAY.as_millis()
            )
        })
        .and_then(|s| {
            s.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| warn!("🪛️ Invalid configuration value for SPG_GATEWAY_RETRY_DELAY_MS. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_RETRY_DELAY);
    RetryPolicy::new(max_attempts, delay)
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret used to validate bearer access tokens.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. No access token issued \
             elsewhere will be accepted. DO NOT operate on production like this. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(64).map(char::from).collect::<String>();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { jwt_secret: Secret::new(secret.into()) }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("SPG_JWT_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [SPG_JWT_SECRET]")))?;
        let jwt_secret = Secret::new(secret);
        if jwt_secret.is_blank() {
            return Err(ServerError::ConfigurationError("SPG_JWT_SECRET is empty".to_string()));
        }
        Ok(Self { jwt_secret })
    }
}

//-------------------------------------------------  WebhookConfig  ----------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct WebhookConfig {
    pub hmac_secret: Secret<String>,
    /// Only meaningful when a secret is configured.
    pub hmac_checks: bool,
}

impl WebhookConfig {
    pub fn from_env_or_defaults() -> Self {
        let hmac_secret = Secret::new(env::var("SPG_WEBHOOK_HMAC_SECRET").unwrap_or_default());
        let has_secret = !hmac_secret.is_blank();
        let hmac_checks = has_secret && env_flag("SPG_WEBHOOK_HMAC_CHECKS", true);
        match (has_secret, hmac_checks) {
            (false, _) => info!("🪛️ SPG_WEBHOOK_HMAC_SECRET is not set. Webhook signatures will not be checked."),
            (true, false) => warn!("🚨️ Webhook HMAC checks are DISABLED, even though a secret is configured."),
            (true, true) => info!("🪛️ Webhooks must carry a valid X-Gateway-Signature header."),
        }
        Self { hmac_secret, hmac_checks }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
