//! Process configuration
//!
//! All settings are read once at startup from environment variables. Secrets
//! are held in memory only and never logged.
//!
//! - `SUPABASE_URL`: table store base URL
//! - `SUPABASE_SERVICE_ROLE_KEY` (falls back to `SUPABASE_KEY`): store credential
//! - `PADDLE_SECRET_API_KEY`: billing provider API key
//! - `PADDLE_ENVIRONMENT`: `sandbox` (default) or `production`
//! - `PADDLE_WEBHOOK_SECRET`: webhook signing secret
//! - `PADDLE_SIGNATURE_MAX_VARIANCE_SECS`: allowed clock drift (default: 5)
//! - `WEBHOOK_FAIL_ON_HANDLER_ERROR`: answer 500 when a handler fails (default: false)
//! - `HTTP_CLIENT_TIMEOUT_SECS`: outbound request timeout (default: 10)
//! - `CORS_ALLOWED_ORIGINS`: comma-separated origins for `/api/*` (default: any)

use std::env;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::ConfigError;

/// Result type for configuration loading
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Default allowed clock drift on signed webhooks
pub const DEFAULT_MAX_VARIANCE_SECS: u64 = 5;

/// Default timeout for outbound store and provider calls
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Billing provider environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddleEnvironment {
    /// Sandbox API (`sandbox-api.paddle.com`)
    Sandbox,
    /// Live API (`api.paddle.com`)
    Production,
}

impl PaddleEnvironment {
    /// Parse the `PADDLE_ENVIRONMENT` value; anything but `sandbox` is production.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("sandbox") {
            Self::Sandbox
        } else {
            Self::Production
        }
    }

    /// REST API base URL for this environment
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox-api.paddle.com",
            Self::Production => "https://api.paddle.com",
        }
    }
}

/// Table store connection settings
#[derive(Clone)]
pub struct StoreConfig {
    /// Base URL of the Supabase project
    pub url: String,
    /// Service role (or anon) key
    pub api_key: String,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Billing provider settings
#[derive(Clone)]
pub struct PaddleConfig {
    /// Secret API key
    pub api_key: String,
    /// Sandbox or production
    pub environment: PaddleEnvironment,
    /// Webhook signing secret
    pub webhook_secret: String,
    /// Allowed drift between signature timestamp and now; zero disables the check
    pub max_variance: Duration,
}

impl std::fmt::Debug for PaddleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaddleConfig")
            .field("api_key", &"<redacted>")
            .field("environment", &self.environment)
            .field("webhook_secret", &"<redacted>")
            .field("max_variance", &self.max_variance)
            .finish()
    }
}

/// Full process configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Store settings; `None` when the in-memory store is used
    pub store: Option<StoreConfig>,
    /// Billing provider settings
    pub paddle: PaddleConfig,
    /// Answer 500 instead of 200 when an event handler fails
    pub fail_on_handler_error: bool,
    /// Timeout applied to every outbound request
    pub http_timeout: Duration,
    /// Origins allowed on `/api/*`; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// When `in_memory_store` is set the store variables are not required.
    pub fn from_env(in_memory_store: bool) -> ConfigResult<Self> {
        Self::from_lookup(|name| env::var(name).ok(), in_memory_store)
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F, in_memory_store: bool) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let store = if in_memory_store {
            info!("Using in-memory table store");
            None
        } else {
            let url = get("SUPABASE_URL").ok_or(ConfigError::MissingVar("SUPABASE_URL"))?;
            let api_key = get("SUPABASE_SERVICE_ROLE_KEY")
                .or_else(|| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, falling back to SUPABASE_KEY");
                    get("SUPABASE_KEY")
                })
                .ok_or(ConfigError::MissingVar("SUPABASE_SERVICE_ROLE_KEY"))?;
            url::Url::parse(&url).map_err(|_| ConfigError::InvalidValue {
                name: "SUPABASE_URL",
                value: url.clone(),
            })?;
            Some(StoreConfig {
                url: url.trim_end_matches('/').to_string(),
                api_key,
            })
        };

        let api_key =
            get("PADDLE_SECRET_API_KEY").ok_or(ConfigError::MissingVar("PADDLE_SECRET_API_KEY"))?;
        let webhook_secret =
            get("PADDLE_WEBHOOK_SECRET").ok_or(ConfigError::MissingVar("PADDLE_WEBHOOK_SECRET"))?;
        let environment = get("PADDLE_ENVIRONMENT")
            .map(|v| PaddleEnvironment::parse(&v))
            .unwrap_or(PaddleEnvironment::Sandbox);

        let max_variance = parse_secs(
            get("PADDLE_SIGNATURE_MAX_VARIANCE_SECS"),
            "PADDLE_SIGNATURE_MAX_VARIANCE_SECS",
            DEFAULT_MAX_VARIANCE_SECS,
        )?;
        let http_timeout = parse_secs(
            get("HTTP_CLIENT_TIMEOUT_SECS"),
            "HTTP_CLIENT_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?;

        let fail_on_handler_error = match get("WEBHOOK_FAIL_ON_HANDLER_ERROR") {
            None => false,
            Some(v) => parse_bool(&v).ok_or(ConfigError::InvalidValue {
                name: "WEBHOOK_FAIL_ON_HANDLER_ERROR",
                value: v,
            })?,
        };

        let cors_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().trim_end_matches('/').to_string())
                    .filter(|o| !o.is_empty() && o != "*")
                    .collect()
            })
            .unwrap_or_default();

        info!(
            environment = ?environment,
            max_variance_secs = max_variance.as_secs(),
            fail_on_handler_error,
            "Configuration loaded"
        );

        Ok(Self {
            store,
            paddle: PaddleConfig {
                api_key,
                environment,
                webhook_secret,
                max_variance,
            },
            fail_on_handler_error,
            http_timeout,
            cors_origins,
        })
    }
}

fn parse_secs(raw: Option<String>, name: &'static str, default: u64) -> ConfigResult<Duration> {
    match raw {
        None => Ok(Duration::from_secs(default)),
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidValue { name, value: v }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
