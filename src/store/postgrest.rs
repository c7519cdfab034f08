//! Supabase (PostgREST) table store
//!
//! Rows are written with `POST /rest/v1/{table}` and patched with
//! `PATCH /rest/v1/{table}?{column}=eq.{value}`; both ask for
//! `Prefer: return=representation` so the affected rows come back in the
//! response body.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{EventStore, Filter, Table};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

const PREFER: HeaderName = HeaderName::from_static("prefer");
const API_KEY: HeaderName = HeaderName::from_static("apikey");
const RETURN_REPRESENTATION: &str = "return=representation";

/// reqwest-backed [`EventStore`] speaking PostgREST
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    http: reqwest::Client,
    rest_url: String,
}

impl PostgrestStore {
    /// Build a store client from configuration
    pub fn new(config: &StoreConfig, timeout: Duration) -> StoreResult<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| StoreError::Request(format!("invalid store key header: {e}")))?;
        key.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| StoreError::Request(format!("invalid store key header: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert(API_KEY, key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/{}", self.rest_url, table.as_str())
    }

    async fn rows(response: reqwest::Response) -> StoreResult<Vec<Value>> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Value>(&body)
            .map_err(|e| StoreError::InvalidRow(e.to_string()))?
        {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            single => Ok(vec![single]),
        }
    }
}

/// Render filters as PostgREST query pairs
pub fn query_pairs(filters: &[Filter]) -> Vec<(&'static str, String)> {
    filters
        .iter()
        .map(|f| (f.column, format!("eq.{}", f.value)))
        .collect()
}

#[async_trait::async_trait]
impl EventStore for PostgrestStore {
    #[instrument(skip_all, fields(table = %table))]
    async fn insert(&self, table: Table, row: Value) -> StoreResult<Vec<Value>> {
        let response = self
            .http
            .post(self.table_url(table))
            .header(PREFER, RETURN_REPRESENTATION)
            .json(&row)
            .send()
            .await?;
        let rows = Self::rows(response).await?;
        debug!(rows = rows.len(), "Insert completed");
        Ok(rows)
    }

    #[instrument(skip_all, fields(table = %table))]
    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> StoreResult<Vec<Value>> {
        let response = self
            .http
            .patch(self.table_url(table))
            .query(&query_pairs(filters))
            .header(PREFER, RETURN_REPRESENTATION)
            .json(&patch)
            .send()
            .await?;
        let rows = Self::rows(response).await?;
        debug!(rows = rows.len(), "Update completed");
        Ok(rows)
    }

    #[instrument(skip_all, fields(table = %table))]
    async fn select(&self, table: Table, filters: &[Filter]) -> StoreResult<Vec<Value>> {
        let mut query = vec![("select", "*".to_string())];
        query.extend(query_pairs(filters));

        let response = self
            .http
            .get(self.table_url(table))
            .query(&query)
            .send()
            .await?;
        Self::rows(response).await
    }
}
