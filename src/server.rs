//! HTTP server assembly
//!
//! ```text
//! Config ──▶ AppState::from_config ──▶ router ──▶ serve
//!               │
//!               ├── Arc<dyn EventStore>    (PostgrestStore | InMemoryStore)
//!               ├── Arc<dyn BillingClient> (PaddleClient)
//!               ├── Arc<dyn EventHandler>  (MirrorHandler)
//!               └── SignatureVerifier
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::error::Result;
use crate::handlers::read::{check_subscription, customer_subscription, get_subscription, list_products};
use crate::handlers::status::status_router;
use crate::paddle::client::{BillingClient, PaddleClient};
use crate::paddle::signature::SignatureVerifier;
use crate::store::{EventStore, InMemoryStore, PostgrestStore};
use crate::webhook::handler::{acknowledge_preflight, webhook_handler, WebhookOptions};
use crate::webhook::processor::{EventHandler, MirrorHandler};

/// Shared, immutable request state
pub struct AppState {
    /// Table store
    pub store: Arc<dyn EventStore>,
    /// Billing provider client
    pub billing: Arc<dyn BillingClient>,
    /// Event handler used by the webhook dispatcher
    pub events: Arc<dyn EventHandler>,
    /// Webhook signature verifier
    pub verifier: SignatureVerifier,
    /// Webhook endpoint behaviour
    pub webhook: WebhookOptions,
}

impl AppState {
    /// State whose event handler mirrors into `store`
    pub fn new(
        store: Arc<dyn EventStore>,
        billing: Arc<dyn BillingClient>,
        verifier: SignatureVerifier,
    ) -> Self {
        let events = Arc::new(MirrorHandler::new(store.clone(), billing.clone()));
        Self {
            store,
            billing,
            events,
            verifier,
            webhook: WebhookOptions::default(),
        }
    }

    /// Set webhook endpoint options
    pub fn with_webhook_options(mut self, webhook: WebhookOptions) -> Self {
        self.webhook = webhook;
        self
    }

    /// Build the production clients described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn EventStore> = match &config.store {
            Some(store) => Arc::new(PostgrestStore::new(store, config.http_timeout)?),
            None => Arc::new(InMemoryStore::new()),
        };
        let billing = Arc::new(PaddleClient::new(&config.paddle, config.http_timeout)?);
        let verifier = SignatureVerifier::new(
            config.paddle.webhook_secret.clone(),
            config.paddle.max_variance,
        );

        Ok(Self::new(store, billing, verifier).with_webhook_options(WebhookOptions {
            fail_on_handler_error: config.fail_on_handler_error,
        }))
    }
}

/// All routes, with `cors` applied to `/api/*`
pub fn router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    let webhooks = Router::new()
        .route("/api/webhook", post(webhook_handler))
        .route("/api/paddle/webhook", post(webhook_handler))
        .layer(cors.clone())
        .layer(middleware::from_fn(acknowledge_preflight));

    let reads = Router::new()
        .route("/api/products", get(list_products))
        .route("/api/subscriptions/:id", get(get_subscription))
        .route("/api/customer/:id/subscription", get(customer_subscription))
        .route("/api/check-subscription", get(check_subscription))
        .layer(cors);

    Router::new()
        .merge(webhooks)
        .merge(reads)
        .merge(status_router())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM
pub async fn serve(addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Paddle relay listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
