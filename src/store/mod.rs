//! Event store
//!
//! Table-oriented persistence mirroring billing state. The relay only needs
//! three operations: insert a row, patch rows matching equality filters, and
//! select rows matching equality filters. Writes return the affected rows so
//! callers can tell an accepted write from a silently empty one.
//!
//! ```text
//! Event Handlers ──▶ EventStore ──┬──▶ PostgrestStore (Supabase REST)
//! Read Endpoints ──▶              └──▶ InMemoryStore  (tests, local runs)
//! ```

pub mod memory;
pub mod postgrest;
pub mod records;

use serde_json::Value;

use crate::error::StoreResult;

pub use memory::InMemoryStore;
pub use postgrest::PostgrestStore;
pub use records::{
    SubscriptionActivation, SubscriptionCancellation, SubscriptionItemRecord, SubscriptionRecord,
    SubscriptionRenewal, SubscriptionStatusUpdate, TransactionRecord,
};

/// The three mirrored tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// One row per subscription, keyed by `id`
    Subscriptions,
    /// One row per item per `subscription.created` delivery
    SubscriptionItems,
    /// One row per transaction, keyed by `id`
    Transactions,
}

impl Table {
    /// Table name in the store
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscriptions => "subscriptions",
            Self::SubscriptionItems => "subscription_items",
            Self::Transactions => "transactions",
        }
    }

    /// Column enforced unique by the store, if any
    pub fn primary_key(&self) -> Option<&'static str> {
        match self {
            Self::Subscriptions | Self::Transactions => Some("id"),
            Self::SubscriptionItems => None,
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equality predicate `column = value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Column name
    pub column: &'static str,
    /// Value compared as text
    pub value: String,
}

impl Filter {
    /// Build an equality filter
    pub fn eq(column: &'static str, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }

    /// Whether a JSON row satisfies this filter
    pub fn matches(&self, row: &Value) -> bool {
        match row.get(self.column) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == self.value,
        }
    }
}

/// Remote table store
#[async_trait::async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// Insert one row, returning the stored representation
    async fn insert(&self, table: Table, row: Value) -> StoreResult<Vec<Value>>;

    /// Apply `patch` to every row matching all `filters`, returning the updated rows
    async fn update(&self, table: Table, filters: &[Filter], patch: Value)
        -> StoreResult<Vec<Value>>;

    /// Every row matching all `filters`
    async fn select(&self, table: Table, filters: &[Filter]) -> StoreResult<Vec<Value>>;
}
