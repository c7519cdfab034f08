//! Error types for Paddle Relay
//!
//! This module provides the error type hierarchy using `thiserror` for every
//! component of the relay, plus the HTTP mapping used by the axum handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// The main error type for Paddle Relay operations
#[derive(Error, Debug)]
pub enum Error {
    /// Table store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Billing provider API errors
    #[error("Billing error: {0}")]
    Billing(#[from] BillingError),

    /// Event handler errors
    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("{0} environment variable not set")]
    MissingVar(&'static str),

    /// An environment variable could not be parsed
    #[error("Invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name
        name: &'static str,
        /// Raw value found
        value: String,
    },
}

/// Table store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport-level failure talking to the store
    #[error("Store request failed: {0}")]
    Request(String),

    /// The store answered with a non-success status
    #[error("Store returned HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// A write was accepted but returned no rows
    #[error("Write to {0} returned no data")]
    NoData(&'static str),

    /// Primary key collision
    #[error("Duplicate key {id} in {table}")]
    Conflict {
        /// Table name
        table: &'static str,
        /// Conflicting id
        id: String,
    },

    /// Row payload could not be encoded or decoded
    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

/// Billing provider API errors
#[derive(Error, Debug)]
pub enum BillingError {
    /// Transport-level failure
    #[error("Billing request failed: {0}")]
    Request(String),

    /// The provider returned an error document
    #[error("Billing API error {status} ({code}): {detail}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Provider error code
        code: String,
        /// Human readable detail
        detail: String,
    },

    /// Response body did not match the expected shape
    #[error("Unexpected billing response: {0}")]
    Decode(String),
}

/// Webhook signature verification errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// No signature header on the request
    #[error("Missing signature header")]
    Missing,

    /// Header present but not `ts=...;h1=...`
    #[error("Invalid signature format")]
    InvalidFormat,

    /// Timestamp outside the allowed variance
    #[error("Signature timestamp outside allowed variance")]
    Expired,

    /// No `h1` value matched the computed digest
    #[error("Invalid signature")]
    Invalid,
}

/// Failures reported by an event handler back to the dispatcher
#[derive(Error, Debug)]
pub enum HandlerError {
    /// `data` holds a field of the wrong type
    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),

    /// The billing provider lookup needed by the handler failed
    #[error("Provider lookup failed: {0}")]
    ProviderLookup(#[source] BillingError),

    /// A single store write failed
    #[error("Store write failed: {0}")]
    Write(#[from] StoreError),

    /// Some of several writes failed
    #[error("{failed} of {attempted} writes failed")]
    PartialWrite {
        /// Failed write count
        failed: usize,
        /// Attempted write count
        attempted: usize,
    },
}

/// Result type alias for Paddle Relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for billing provider operations
pub type BillingResult<T> = std::result::Result<T, BillingError>;

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Request(err.to_string())
    }
}

impl From<reqwest::Error> for BillingError {
    fn from(err: reqwest::Error) -> Self {
        BillingError::Request(err.to_string())
    }
}

// =============================================================================
// HTTP mapping
// =============================================================================

/// Body returned for every 500; internal detail only goes to the log.
pub const GENERIC_ERROR_MESSAGE: &str = "Internal server error";

/// Errors surfaced by the HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// Webhook signature missing or wrong
    #[error("Invalid signature")]
    Unauthorized,

    /// Caller sent an unusable request
    #[error("{0}")]
    BadRequest(String),

    /// Anything else
    #[error(transparent)]
    Internal(#[from] Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.into())
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        ApiError::Internal(err.into())
    }
}

impl From<HandlerError> for ApiError {
    fn from(err: HandlerError) -> Self {
        ApiError::Internal(err.into())
    }
}

impl ApiError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Unauthorized => "Invalid signature".to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "Request failed");
                GENERIC_ERROR_MESSAGE.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
