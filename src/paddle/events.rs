//! Paddle Event Types
//!
//! Representations of the Paddle notification envelope and the parts of its
//! `data` object the relay reads. Every field is optional: absent values are
//! carried through as `null` rather than rejected.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HandlerError;

/// Paddle event types we handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaddleEventType {
    #[serde(rename = "subscription.created")]
    SubscriptionCreated,
    #[serde(rename = "subscription.updated")]
    SubscriptionUpdated,
    #[serde(rename = "subscription.canceled")]
    SubscriptionCanceled,
    #[serde(rename = "subscription.renewed")]
    SubscriptionRenewed,
    #[serde(rename = "subscription.activated")]
    SubscriptionActivated,
    #[serde(rename = "transaction.created")]
    TransactionCreated,

    // Catch-all for events we don't explicitly handle
    #[serde(other)]
    Unknown,
}

impl FromStr for PaddleEventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "subscription.created" => Self::SubscriptionCreated,
            "subscription.updated" => Self::SubscriptionUpdated,
            "subscription.canceled" => Self::SubscriptionCanceled,
            "subscription.renewed" => Self::SubscriptionRenewed,
            "subscription.activated" => Self::SubscriptionActivated,
            "transaction.created" => Self::TransactionCreated,
            _ => Self::Unknown,
        })
    }
}

impl PaddleEventType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubscriptionCreated => "subscription.created",
            Self::SubscriptionUpdated => "subscription.updated",
            Self::SubscriptionCanceled => "subscription.canceled",
            Self::SubscriptionRenewed => "subscription.renewed",
            Self::SubscriptionActivated => "subscription.activated",
            Self::TransactionCreated => "transaction.created",
            Self::Unknown => "unknown",
        }
    }

    /// Check if this is a known event type
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Paddle notification envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaddleEvent {
    /// Unique event identifier (evt_...)
    #[serde(default, deserialize_with = "string_or_none")]
    pub event_id: Option<String>,

    /// Raw event type string
    #[serde(default, deserialize_with = "string_or_none")]
    pub event_type: Option<String>,

    /// RFC 3339 time the event occurred
    #[serde(default, deserialize_with = "string_or_none")]
    pub occurred_at: Option<String>,

    /// Notification identifier (ntf_...)
    #[serde(default, deserialize_with = "string_or_none")]
    pub notification_id: Option<String>,

    /// The entity the event is about
    #[serde(default)]
    pub data: Option<Value>,
}

impl PaddleEvent {
    /// Parse from raw JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Get the typed event type
    pub fn typed_event_type(&self) -> PaddleEventType {
        self.event_type
            .as_deref()
            .and_then(|s| PaddleEventType::from_str(s).ok())
            .unwrap_or(PaddleEventType::Unknown)
    }

    /// The `data` object, or an empty object when the sender left it out.
    pub fn data_or_empty(&self) -> Value {
        self.data
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    /// Decode `data` as a subscription entity
    pub fn subscription(&self) -> Result<SubscriptionData, HandlerError> {
        decode(self.data_or_empty())
    }

    /// Decode `data` as a transaction entity
    pub fn transaction(&self) -> Result<TransactionData, HandlerError> {
        decode(self.data_or_empty())
    }
}

/// Envelope metadata that is not a string is treated as absent.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, HandlerError> {
    serde_json::from_value(value).map_err(|e| HandlerError::InvalidPayload(e.to_string()))
}

// =============================================================================
// Subscription Types
// =============================================================================

/// Subscription entity as carried in `data`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionData {
    /// Subscription ID (sub_...)
    #[serde(default)]
    pub id: Option<String>,
    /// Customer ID (ctm_...)
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Subscription status
    #[serde(default)]
    pub status: Option<String>,
    /// Next billing date
    #[serde(default)]
    pub next_billed_at: Option<String>,
    /// Three-letter currency code
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// When the subscription was canceled
    #[serde(default)]
    pub canceled_at: Option<String>,
    /// Items, kept raw so each can be stored verbatim
    #[serde(default)]
    pub items: Vec<Value>,
}

/// Subscription item entity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionItemData {
    #[serde(default)]
    pub price: Option<EntityRef>,
    #[serde(default)]
    pub product: Option<EntityRef>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub next_billed_at: Option<String>,
}

impl SubscriptionItemData {
    /// Decode one raw item
    pub fn from_value(value: &Value) -> Result<Self, HandlerError> {
        decode(value.clone())
    }
}

/// Nested price or product reference
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

// =============================================================================
// Transaction Types
// =============================================================================

/// Transaction entity as carried in `data`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionData {
    /// Transaction ID (txn_...)
    #[serde(default)]
    pub id: Option<String>,
    /// Owning subscription; absent for one-time purchases
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub details: Option<TransactionDetails>,
}

impl TransactionData {
    /// `details.totals.total`, if present
    pub fn total(&self) -> Option<String> {
        self.details
            .as_ref()
            .and_then(|d| d.totals.as_ref())
            .and_then(|t| t.total.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionDetails {
    #[serde(default)]
    pub totals: Option<TransactionTotals>,
}

/// Totals are decimal strings in the lowest currency unit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionTotals {
    #[serde(default)]
    pub total: Option<String>,
}
