//! Read endpoints over the billing provider and the event store.
//!
//! ```text
//! GET /api/products                    ──▶ BillingClient::list_products
//! GET /api/subscriptions/{id}          ──▶ BillingClient::get_subscription
//! GET /api/customer/{id}/subscription  ──▶ EventStore::select (active rows)
//! GET /api/check-subscription?user_id= ──▶ EventStore::select (active rows)
//! ```

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, instrument};

use crate::error::{ApiError, StoreResult, GENERIC_ERROR_MESSAGE};
use crate::paddle::client::{Product, Subscription};
use crate::server::AppState;
use crate::store::{EventStore, Filter, Table};

/// `GET /api/products` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductsResponse {
    /// Every product across all pages
    pub products: Vec<Product>,
}

/// Provider subscription projection returned by `GET /api/subscriptions/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionView {
    /// Subscription id
    pub id: String,
    /// Provider status
    pub status: String,
    /// Owning customer
    pub customer_id: Option<String>,
    /// Next billing time
    pub next_billed_at: Option<String>,
    /// Creation time
    pub created_at: Option<String>,
}

impl From<Subscription> for SubscriptionView {
    fn from(sub: Subscription) -> Self {
        Self {
            id: sub.id,
            status: sub.status,
            customer_id: sub.customer_id,
            next_billed_at: sub.next_billed_at,
            created_at: sub.created_at,
        }
    }
}

/// Active-subscription lookup result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerSubscriptions {
    /// Whether at least one active row exists
    pub has_active_subscription: bool,
    /// The active rows, empty when none
    pub subscriptions: Vec<Value>,
    /// Set when the lookup failed and the answer is a fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CustomerSubscriptions {
    fn from_rows(subscriptions: Vec<Value>) -> Self {
        Self {
            has_active_subscription: !subscriptions.is_empty(),
            subscriptions,
            error: None,
        }
    }

    fn unavailable() -> Self {
        Self {
            has_active_subscription: false,
            subscriptions: Vec::new(),
            error: Some(GENERIC_ERROR_MESSAGE.to_string()),
        }
    }
}

/// `check-subscription` query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckSubscriptionParams {
    /// Customer id, named `user_id` by front-end callers
    pub user_id: Option<String>,
}

async fn active_subscriptions(store: &dyn EventStore, customer_id: &str) -> StoreResult<Vec<Value>> {
    store
        .select(
            Table::Subscriptions,
            &[
                Filter::eq("customer_id", customer_id),
                Filter::eq("status", "active"),
            ],
        )
        .await
}

/// `GET /api/products`
#[instrument(skip_all)]
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProductsResponse>, ApiError> {
    let products = state.billing.list_products().await?;
    info!(count = products.len(), "Listed products");
    Ok(Json(ProductsResponse { products }))
}

/// `GET /api/subscriptions/{id}`
#[instrument(skip_all)]
pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionView>, ApiError> {
    let subscription = state.billing.get_subscription(&id).await?;
    Ok(Json(subscription.into()))
}

/// `GET /api/customer/{id}/subscription`
#[instrument(skip_all)]
pub async fn customer_subscription(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
) -> Result<Json<CustomerSubscriptions>, ApiError> {
    let rows = active_subscriptions(state.store.as_ref(), &customer_id).await?;
    Ok(Json(CustomerSubscriptions::from_rows(rows)))
}

/// `GET /api/check-subscription?user_id=...`
///
/// Store failures answer `200` with `has_active_subscription: false`.
#[instrument(skip_all)]
pub async fn check_subscription(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CheckSubscriptionParams>,
) -> Response {
    let user_id = match params.user_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "User ID is required",
                    "has_active_subscription": false,
                })),
            )
                .into_response()
        }
    };

    match active_subscriptions(state.store.as_ref(), &user_id).await {
        Ok(rows) => Json(CustomerSubscriptions::from_rows(rows)).into_response(),
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Error checking subscription");
            Json(CustomerSubscriptions::unavailable()).into_response()
        }
    }
}
