//! CORS (Cross-Origin Resource Sharing) Configuration for Paddle Relay
//!
//! Browser front-ends call the read endpoints directly, and Paddle's own
//! webhook simulator posts from the dashboard, so `/api/*` is open to any
//! origin unless a list is configured.
//!
//! # Policy
//!
//! - **Allowed Origins**: any, or the configured list
//! - **Allowed Methods**: GET, POST, OPTIONS (preflight)
//! - **Allowed Headers**: Content-Type, Paddle-Signature, X-Paddle-Signature
//! - **Max Age**: 3600 seconds (1 hour) for preflight caching
//!
//! # Example
//!
//! ```rust,ignore
//! use paddle_relay::cors::cors_layer;
//! use axum::Router;
//!
//! let app = Router::new()
//!     .route("/api/webhook", post(webhook_handler))
//!     .layer(cors_layer());
//! ```

use std::time::Duration;

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

/// Allowed request headers on `/api/*`
pub const ALLOWED_HEADERS: [HeaderName; 3] = [
    CONTENT_TYPE,
    HeaderName::from_static("paddle-signature"),
    HeaderName::from_static("x-paddle-signature"),
];

/// Allowed methods on `/api/*`
pub const ALLOWED_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];

/// Default max age for preflight cache (1 hour)
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;

/// Creates the default CORS layer: any origin, relay methods and headers.
pub fn cors_layer() -> CorsLayer {
    cors_layer_with_config(CorsConfig::default())
}

/// Creates a CORS layer with custom configuration.
///
/// ```rust,no_run
/// use paddle_relay::cors::{cors_layer_with_config, CorsConfig};
///
/// let config = CorsConfig::default()
///     .with_origins(vec!["https://app.example.com".to_string()])
///     .with_max_age(7200);
///
/// let layer = cors_layer_with_config(config);
/// ```
pub fn cors_layer_with_config(config: CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(config.allowed_methods.clone())
        .allow_headers(config.allowed_headers.clone())
        .max_age(Duration::from_secs(config.max_age_secs));

    if config.allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unusable CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

/// CORS configuration options.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Exact origins allowed; empty allows any origin
    pub allowed_origins: Vec<String>,
    /// Maximum age for preflight cache in seconds
    pub max_age_secs: u64,
    /// Allowed HTTP methods
    pub allowed_methods: Vec<Method>,
    /// Allowed request headers
    pub allowed_headers: Vec<HeaderName>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            allowed_methods: ALLOWED_METHODS.to_vec(),
            allowed_headers: ALLOWED_HEADERS.to_vec(),
        }
    }
}

impl CorsConfig {
    /// Create a new CORS configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the given origins (empty keeps any origin).
    pub fn with_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// Set the maximum age for preflight cache.
    pub fn with_max_age(mut self, secs: u64) -> Self {
        self.max_age_secs = secs;
        self
    }
}
