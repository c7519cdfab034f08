//! Status and health check handlers for Paddle Relay.
//!
//! This module provides HTTP endpoints for monitoring the relay:
//! - `/health` - Simple health check for systemd/load balancers
//! - `/metrics` - Webhook counters in Prometheus text format
//!
//! # Architecture
//!
//! ```text
//! HTTP Request ──> Axum Router ──> health_handler  ──> HealthResponse
//!                            └──> metrics_handler ──> global_metrics()
//! ```

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::metrics::global_metrics;

/// Server version from Cargo.toml
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name from Cargo.toml
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

// ============================================================================
// Response Types
// ============================================================================

/// Health check response for simple liveness probes.
///
/// Used by systemd, Kubernetes, and load balancers to verify the service is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status (always "healthy" if responding)
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Simple health check endpoint.
///
/// # Route
/// `GET /health`
///
/// ```bash
/// curl http://localhost:5000/health
/// # {"status":"healthy"}
/// ```
#[instrument(skip_all)]
pub async fn health_handler() -> impl IntoResponse {
    debug!("Health check requested");
    (StatusCode::OK, Json(HealthResponse::default()))
}

/// Prometheus text export of the webhook counters.
///
/// # Route
/// `GET /metrics`
#[instrument(skip_all)]
pub async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        global_metrics().to_prometheus_format(),
    )
}

// ============================================================================
// Router Setup
// ============================================================================

/// Router with the status endpoints, generic over the outer state.
pub fn status_router<S>() -> axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
}
