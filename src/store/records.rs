//! Row shapes written to the store
//!
//! Each struct serialises to exactly the columns its table receives. Absent
//! values serialise as `null`.

// Column names document themselves
#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;
use crate::paddle::events::{SubscriptionData, SubscriptionItemData, TransactionData};

/// Row in `subscriptions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: Option<String>,
    pub customer_id: Option<String>,
    pub status: Option<String>,
    pub next_billing_date: Option<String>,
    pub currency: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub items_count: usize,
    /// The event `data` object as a JSON string
    pub raw_data: String,
}

impl SubscriptionRecord {
    /// Map a `subscription.created` payload
    pub fn from_event(data: &SubscriptionData, raw: &Value) -> Self {
        Self {
            id: data.id.clone(),
            customer_id: data.customer_id.clone(),
            status: data.status.clone(),
            next_billing_date: data.next_billed_at.clone(),
            currency: data.currency_code.clone(),
            created_at: data.created_at.clone(),
            updated_at: data.updated_at.clone(),
            items_count: data.items.len(),
            raw_data: raw.to_string(),
        }
    }
}

/// Row in `subscription_items`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionItemRecord {
    pub subscription_id: Option<String>,
    pub price_id: Option<String>,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub quantity: Option<i64>,
    pub status: Option<String>,
    pub next_billed_at: Option<String>,
    /// The item object as a JSON string
    pub raw_data: String,
}

impl SubscriptionItemRecord {
    /// Map one entry of `data.items`
    pub fn from_item(subscription_id: Option<String>, item: &SubscriptionItemData, raw: &Value) -> Self {
        Self {
            subscription_id,
            price_id: item.price.as_ref().and_then(|p| p.id.clone()),
            product_id: item.product.as_ref().and_then(|p| p.id.clone()),
            product_name: item.product.as_ref().and_then(|p| p.name.clone()),
            quantity: item.quantity,
            status: item.status.clone(),
            next_billed_at: item.next_billed_at.clone(),
            raw_data: raw.to_string(),
        }
    }
}

/// Row in `transactions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Option<String>,
    pub subscription_id: Option<String>,
    pub status: Option<String>,
    /// `details.totals.total`
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub raw_data: String,
}

impl TransactionRecord {
    /// Map a `transaction.created` payload
    pub fn from_event(data: &TransactionData, raw: &Value) -> Self {
        Self {
            id: data.id.clone(),
            subscription_id: data.subscription_id.clone(),
            status: data.status.clone(),
            amount: data.total(),
            currency: data.currency_code.clone(),
            created_at: data.created_at.clone(),
            updated_at: data.updated_at.clone(),
            raw_data: raw.to_string(),
        }
    }
}

// =============================================================================
// Patches applied to `subscriptions`
// =============================================================================

/// `subscription.updated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionStatusUpdate {
    pub status: Option<String>,
    pub updated_at: String,
    pub raw_data: String,
}

/// `subscription.canceled`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionCancellation {
    /// Always `"canceled"`
    pub status: String,
    pub canceled_at: Option<String>,
    pub updated_at: String,
    /// Always `false`
    pub is_active: bool,
    pub raw_data: String,
}

/// `subscription.renewed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRenewal {
    pub next_billing_date: Option<String>,
    pub updated_at: String,
    pub raw_data: String,
}

/// `subscription.activated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionActivation {
    /// Status reported by the provider lookup
    pub status: String,
    /// Always `true`
    pub is_active: bool,
    pub updated_at: String,
    pub raw_data: String,
}

/// Serialise a record into a JSON row
pub fn to_row<T: Serialize>(record: &T) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::InvalidRow(e.to_string()))
}
