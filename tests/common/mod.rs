//! Shared harness for router-level tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use paddle_relay::cors::cors_layer;
use paddle_relay::error::{BillingError, BillingResult, StoreError, StoreResult};
use paddle_relay::paddle::client::{BillingClient, BillingPeriod, Product, Subscription};
use paddle_relay::paddle::signature::{SignatureVerifier, SIGNATURE_HEADER};
use paddle_relay::server::{router, AppState};
use paddle_relay::store::{EventStore, Filter, InMemoryStore, Table};
use paddle_relay::webhook::WebhookOptions;

pub const SECRET: &str = "pdl_ntfset_01hv8wptq8987qeep44cyrewp9_secret";

/// Billing provider double answering from fixed data
#[derive(Default)]
pub struct ScriptedBilling {
    pub subscriptions: HashMap<String, Subscription>,
    pub products: Vec<Product>,
    pub fail: bool,
    pub lookups: AtomicUsize,
}

impl ScriptedBilling {
    pub fn with_subscription(mut self, id: &str, status: &str) -> Self {
        self.subscriptions.insert(
            id.to_string(),
            Subscription {
                id: id.to_string(),
                status: status.to_string(),
                customer_id: Some("ctm_01".to_string()),
                next_billed_at: Some("2024-05-12T10:18:48.294633Z".to_string()),
                created_at: Some("2024-04-12T10:18:47.635628Z".to_string()),
                current_billing_period: Some(BillingPeriod {
                    starts_at: "2024-04-12T10:18:48.294633Z".to_string(),
                    ends_at: "2024-05-12T10:18:48.294633Z".to_string(),
                }),
            },
        );
        self
    }

    /// Drop the billing period of an already scripted subscription
    pub fn without_billing_period(mut self, id: &str) -> Self {
        if let Some(sub) = self.subscriptions.get_mut(id) {
            sub.current_billing_period = None;
        }
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl BillingClient for ScriptedBilling {
    async fn get_subscription(&self, id: &str) -> BillingResult<Subscription> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BillingError::Request("provider unreachable".into()));
        }
        self.subscriptions
            .get(id)
            .cloned()
            .ok_or_else(|| BillingError::Api {
                status: 404,
                code: "entity_not_found".into(),
                detail: format!("Subscription {id} not found"),
            })
    }

    async fn list_products(&self) -> BillingResult<Vec<Product>> {
        if self.fail {
            return Err(BillingError::Request("provider unreachable".into()));
        }
        Ok(self.products.clone())
    }
}

/// Store whose every call fails
pub struct UnavailableStore;

#[async_trait::async_trait]
impl EventStore for UnavailableStore {
    async fn insert(&self, _table: Table, _row: Value) -> StoreResult<Vec<Value>> {
        Err(unavailable())
    }

    async fn update(&self, _table: Table, _filters: &[Filter], _patch: Value) -> StoreResult<Vec<Value>> {
        Err(unavailable())
    }

    async fn select(&self, _table: Table, _filters: &[Filter]) -> StoreResult<Vec<Value>> {
        Err(unavailable())
    }
}

fn unavailable() -> StoreError {
    StoreError::Http {
        status: 503,
        message: "upstream connect error to 10.1.2.3".into(),
    }
}

pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub billing: Arc<ScriptedBilling>,
    pub app: Router,
}

impl TestApp {
    pub fn new(billing: ScriptedBilling) -> Self {
        Self::with_options(billing, WebhookOptions::default())
    }

    pub fn with_options(billing: ScriptedBilling, options: WebhookOptions) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let billing = Arc::new(billing);
        let state = AppState::new(store.clone(), billing.clone(), verifier())
            .with_webhook_options(options);
        Self {
            store,
            billing,
            app: router(Arc::new(state), cors_layer()),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Bytes) {
        send(&self.app, request).await
    }

    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.send(request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}

pub fn verifier() -> SignatureVerifier {
    SignatureVerifier::new(SECRET, Duration::from_secs(5))
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes)
}

/// A webhook POST signed now with the shared secret
pub fn signed_webhook(path: &str, body: &str) -> Request<Body> {
    let header = verifier().sign_header(chrono::Utc::now().timestamp(), body.as_bytes());
    webhook_with_header(path, body, SIGNATURE_HEADER, Some(header))
}

pub fn webhook_with_header(
    path: &str,
    body: &str,
    header_name: &str,
    header_value: Option<String>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header("content-type", "application/json");
    if let Some(value) = header_value {
        builder = builder.header(header_name, value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

/// Notification envelope as Paddle sends it
pub fn envelope(event_type: &str, data: Value) -> String {
    serde_json::json!({
        "event_id": "evt_01hv8x2acma1g8s3jr7gq5t2ty",
        "event_type": event_type,
        "occurred_at": "2024-04-12T10:18:49.621022Z",
        "notification_id": "ntf_01hv8x2af3gx4nvxwcbrkrfk5b",
        "data": data,
    })
    .to_string()
}
