//! Paddle Billing API client
//!
//! Only the two lookups the relay needs: fetching a subscription and listing
//! products. Product listing follows Paddle's cursor pagination
//! (`meta.pagination.next`) until `has_more` is false.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::{PaddleConfig, PaddleEnvironment};
use crate::error::{BillingError, BillingResult};

/// Upper bound on followed pages, guards against a cursor that never ends
const MAX_PAGES: usize = 1000;

/// Read access to the billing provider
#[async_trait::async_trait]
pub trait BillingClient: Send + Sync + 'static {
    /// Fetch a single subscription by id
    async fn get_subscription(&self, id: &str) -> BillingResult<Subscription>;

    /// List every product, walking all pages
    async fn list_products(&self) -> BillingResult<Vec<Product>>;
}

/// Subscription entity as returned by `GET /subscriptions/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub next_billed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub current_billing_period: Option<BillingPeriod>,
}

/// Start and end of the current billing period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub starts_at: String,
    pub ends_at: String,
}

/// Product entity as returned by `GET /products`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
    #[serde(default)]
    meta: Option<Meta>,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    detail: String,
}

/// reqwest-backed [`BillingClient`]
#[derive(Debug, Clone)]
pub struct PaddleClient {
    http: reqwest::Client,
    base_url: String,
}

impl PaddleClient {
    /// Build a client for the configured environment.
    pub fn new(config: &PaddleConfig, timeout: Duration) -> BillingResult<Self> {
        Self::with_base_url(&config.api_key, config.environment.base_url(), timeout)
    }

    /// Build a client against an explicit base URL.
    pub fn with_base_url(api_key: &str, base_url: &str, timeout: Duration) -> BillingResult<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| BillingError::Request(format!("invalid API key header: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Environment this client was built for, if it matches a known base URL
    pub fn environment(&self) -> Option<PaddleEnvironment> {
        [PaddleEnvironment::Sandbox, PaddleEnvironment::Production]
            .into_iter()
            .find(|env| env.base_url() == self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> BillingResult<Envelope<T>> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let (code, detail) = match serde_json::from_slice::<ErrorEnvelope>(&bytes) {
                Ok(envelope) => (envelope.error.code, envelope.error.detail),
                Err(_) => (
                    "unknown".to_string(),
                    String::from_utf8_lossy(&bytes).into_owned(),
                ),
            };
            return Err(BillingError::Api {
                status: status.as_u16(),
                code,
                detail,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| BillingError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl BillingClient for PaddleClient {
    #[instrument(skip(self))]
    async fn get_subscription(&self, id: &str) -> BillingResult<Subscription> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| BillingError::Request(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| BillingError::Request("base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["subscriptions", id]);

        let envelope: Envelope<Subscription> = self.get_json(url.as_str()).await?;
        Ok(envelope.data)
    }

    #[instrument(skip(self))]
    async fn list_products(&self) -> BillingResult<Vec<Product>> {
        let mut products = Vec::new();
        let mut next = Some(format!("{}/products", self.base_url));
        let mut pages = 0;

        while let Some(url) = next.take() {
            let envelope: Envelope<Vec<Product>> = self.get_json(&url).await?;
            pages += 1;
            debug!(page = pages, count = envelope.data.len(), "Fetched product page");
            products.extend(envelope.data);

            let pagination = envelope.meta.and_then(|m| m.pagination);
            if let Some(Pagination {
                next: Some(cursor),
                has_more: true,
            }) = pagination
            {
                if pages >= MAX_PAGES {
                    return Err(BillingError::Decode(format!(
                        "product pagination exceeded {MAX_PAGES} pages"
                    )));
                }
                next = Some(cursor);
            }
        }

        Ok(products)
    }
}
