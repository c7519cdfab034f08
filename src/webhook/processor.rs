//! Event Processing
//!
//! Maps each recognised Paddle event onto store writes. Every handler returns
//! a typed result so the HTTP layer decides whether a failure is acknowledged
//! or surfaced to the sender.
//!
//! ```text
//! PaddleEvent ──▶ dispatch ──┬──▶ on_subscription_created   ──▶ insert subscriptions + items
//!                            ├──▶ on_subscription_updated   ──▶ patch subscriptions
//!                            ├──▶ on_subscription_canceled  ──▶ patch subscriptions
//!                            ├──▶ on_subscription_renewed   ──▶ patch subscriptions
//!                            ├──▶ on_subscription_activated ──▶ provider lookup, patch subscriptions
//!                            ├──▶ on_transaction_created    ──▶ insert transactions
//!                            └──▶ Unknown                   ──▶ log, no writes
//! ```

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::error::{BillingError, HandlerError, StoreError, StoreResult};
use crate::paddle::client::BillingClient;
use crate::paddle::events::{PaddleEvent, PaddleEventType, SubscriptionItemData};
use crate::store::records::{
    to_row, SubscriptionActivation, SubscriptionCancellation, SubscriptionItemRecord,
    SubscriptionRecord, SubscriptionRenewal, SubscriptionStatusUpdate, TransactionRecord,
};
use crate::store::{EventStore, Filter, Table};

/// Result of handling one event
pub type HandlerResult = Result<(), HandlerError>;

/// Handler trait for Paddle events
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Handle `subscription.created`
    async fn on_subscription_created(&self, event: &PaddleEvent) -> HandlerResult;

    /// Handle `subscription.updated`
    async fn on_subscription_updated(&self, event: &PaddleEvent) -> HandlerResult;

    /// Handle `subscription.canceled`
    async fn on_subscription_canceled(&self, event: &PaddleEvent) -> HandlerResult;

    /// Handle `subscription.renewed`
    async fn on_subscription_renewed(&self, event: &PaddleEvent) -> HandlerResult;

    /// Handle `subscription.activated`
    async fn on_subscription_activated(&self, event: &PaddleEvent) -> HandlerResult;

    /// Handle `transaction.created`
    async fn on_transaction_created(&self, event: &PaddleEvent) -> HandlerResult;
}

/// Route an event to the matching handler method.
///
/// Unknown event types are logged and succeed without touching the handler.
pub async fn dispatch<H: EventHandler + ?Sized>(handler: &H, event: &PaddleEvent) -> HandlerResult {
    match event.typed_event_type() {
        PaddleEventType::SubscriptionCreated => handler.on_subscription_created(event).await,
        PaddleEventType::SubscriptionUpdated => handler.on_subscription_updated(event).await,
        PaddleEventType::SubscriptionCanceled => handler.on_subscription_canceled(event).await,
        PaddleEventType::SubscriptionRenewed => handler.on_subscription_renewed(event).await,
        PaddleEventType::SubscriptionActivated => handler.on_subscription_activated(event).await,
        PaddleEventType::TransactionCreated => handler.on_transaction_created(event).await,
        PaddleEventType::Unknown => {
            info!(
                event_type = event.event_type.as_deref().unwrap_or("<missing>"),
                "Unhandled event type"
            );
            Ok(())
        }
    }
}

/// Current UTC time as stored in `updated_at`
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A write counts only when the store hands rows back
fn require_rows(table: Table, result: StoreResult<Vec<Value>>) -> StoreResult<Vec<Value>> {
    let rows = result?;
    if rows.is_empty() {
        return Err(StoreError::NoData(table.as_str()));
    }
    Ok(rows)
}

/// Mirrors events into the event store
pub struct MirrorHandler {
    store: Arc<dyn EventStore>,
    billing: Arc<dyn BillingClient>,
}

impl MirrorHandler {
    /// Create a handler over the given store and billing client
    pub fn new(store: Arc<dyn EventStore>, billing: Arc<dyn BillingClient>) -> Self {
        Self { store, billing }
    }

    async fn insert<T: Serialize>(&self, table: Table, record: &T) -> StoreResult<Vec<Value>> {
        let row = to_row(record)?;
        require_rows(table, self.store.insert(table, row).await)
    }

    async fn patch_subscription<T: Serialize>(&self, id: &str, patch: &T) -> StoreResult<Vec<Value>> {
        let patch = to_row(patch)?;
        require_rows(
            Table::Subscriptions,
            self.store
                .update(Table::Subscriptions, &[Filter::eq("id", id)], patch)
                .await,
        )
    }
}

fn subscription_id(id: Option<&str>) -> Result<&str, HandlerError> {
    id.ok_or_else(|| HandlerError::InvalidPayload("data.id is missing".to_string()))
}

#[async_trait::async_trait]
impl EventHandler for MirrorHandler {
    #[instrument(skip_all, fields(event_id = ?event.event_id))]
    async fn on_subscription_created(&self, event: &PaddleEvent) -> HandlerResult {
        let raw = event.data_or_empty();
        let data = event.subscription()?;

        info!(
            subscription_id = ?data.id,
            customer_id = ?data.customer_id,
            status = ?data.status,
            items = data.items.len(),
            next_billing = ?data.next_billed_at,
            currency = ?data.currency_code,
            "New subscription created"
        );

        let mut attempted = 1;
        let mut failed = 0;

        match self
            .insert(Table::Subscriptions, &SubscriptionRecord::from_event(&data, &raw))
            .await
        {
            Ok(_) => info!(subscription_id = ?data.id, "Subscription saved"),
            Err(e) => {
                failed += 1;
                error!(subscription_id = ?data.id, error = %e, "Failed to save subscription");
            }
        }

        // Items are written even when the parent insert failed.
        for raw_item in &data.items {
            attempted += 1;
            let result = match SubscriptionItemData::from_value(raw_item) {
                Ok(item) => {
                    let record = SubscriptionItemRecord::from_item(data.id.clone(), &item, raw_item);
                    self.insert(Table::SubscriptionItems, &record)
                        .await
                        .map_err(HandlerError::from)
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(_) => info!(subscription_id = ?data.id, "Subscription item saved"),
                Err(e) => {
                    failed += 1;
                    error!(subscription_id = ?data.id, error = %e, "Failed to save subscription item");
                }
            }
        }

        if failed > 0 {
            return Err(HandlerError::PartialWrite { failed, attempted });
        }
        Ok(())
    }

    #[instrument(skip_all, fields(event_id = ?event.event_id))]
    async fn on_subscription_updated(&self, event: &PaddleEvent) -> HandlerResult {
        let raw = event.data_or_empty();
        let data = event.subscription()?;
        let id = subscription_id(data.id.as_deref())?;

        info!(subscription_id = %id, status = ?data.status, "Subscription updated");

        let patch = SubscriptionStatusUpdate {
            status: data.status.clone(),
            updated_at: now_timestamp(),
            raw_data: raw.to_string(),
        };

        self.patch_subscription(id, &patch).await.map_err(|e| {
            error!(subscription_id = %id, error = %e, "Failed to update subscription");
            HandlerError::from(e)
        })?;
        info!(subscription_id = %id, "Subscription update stored");
        Ok(())
    }

    #[instrument(skip_all, fields(event_id = ?event.event_id))]
    async fn on_subscription_canceled(&self, event: &PaddleEvent) -> HandlerResult {
        let raw = event.data_or_empty();
        let data = event.subscription()?;
        let id = subscription_id(data.id.as_deref())?;

        info!(subscription_id = %id, canceled_at = ?data.canceled_at, "Subscription canceled");

        let patch = SubscriptionCancellation {
            status: "canceled".to_string(),
            canceled_at: data.canceled_at.clone(),
            updated_at: now_timestamp(),
            is_active: false,
            raw_data: raw.to_string(),
        };

        self.patch_subscription(id, &patch).await.map_err(|e| {
            error!(subscription_id = %id, error = %e, "Failed to update canceled subscription");
            HandlerError::from(e)
        })?;
        info!(subscription_id = %id, "Subscription marked as canceled");
        Ok(())
    }

    #[instrument(skip_all, fields(event_id = ?event.event_id))]
    async fn on_subscription_renewed(&self, event: &PaddleEvent) -> HandlerResult {
        let raw = event.data_or_empty();
        let data = event.subscription()?;
        let id = subscription_id(data.id.as_deref())?;

        info!(subscription_id = %id, next_billed_at = ?data.next_billed_at, "Subscription renewed");

        let patch = SubscriptionRenewal {
            next_billing_date: data.next_billed_at.clone(),
            updated_at: now_timestamp(),
            raw_data: raw.to_string(),
        };

        self.patch_subscription(id, &patch).await.map_err(|e| {
            error!(subscription_id = %id, error = %e, "Failed to update renewed subscription");
            HandlerError::from(e)
        })?;
        info!(subscription_id = %id, "Subscription renewal stored");
        Ok(())
    }

    #[instrument(skip_all, fields(event_id = ?event.event_id))]
    async fn on_subscription_activated(&self, event: &PaddleEvent) -> HandlerResult {
        let raw = event.data_or_empty();
        let data = event.subscription()?;
        let id = subscription_id(data.id.as_deref())?;

        info!(subscription_id = %id, customer_id = ?data.customer_id, "Subscription activated");

        // The provider copy is authoritative; without it nothing is written.
        let subscription = match self.billing.get_subscription(id).await {
            Ok(subscription) => subscription,
            Err(e) => {
                error!(subscription_id = %id, error = %e, "Error retrieving subscription details");
                return Err(HandlerError::ProviderLookup(e));
            }
        };

        let Some(period) = &subscription.current_billing_period else {
            error!(subscription_id = %id, "Provider subscription has no current billing period");
            return Err(HandlerError::ProviderLookup(BillingError::Decode(
                "missing current_billing_period".into(),
            )));
        };
        info!(
            subscription_id = %id,
            starts_at = %period.starts_at,
            ends_at = %period.ends_at,
            "Subscription activated with billing period"
        );

        let patch = SubscriptionActivation {
            status: subscription.status,
            is_active: true,
            updated_at: now_timestamp(),
            raw_data: raw.to_string(),
        };

        self.patch_subscription(id, &patch).await.map_err(|e| {
            error!(subscription_id = %id, error = %e, "Failed to update activated subscription");
            HandlerError::from(e)
        })?;
        info!(subscription_id = %id, "Subscription activation stored");
        Ok(())
    }

    #[instrument(skip_all, fields(event_id = ?event.event_id))]
    async fn on_transaction_created(&self, event: &PaddleEvent) -> HandlerResult {
        let raw = event.data_or_empty();
        let data = event.transaction()?;

        info!(
            transaction_id = ?data.id,
            subscription_id = ?data.subscription_id,
            status = ?data.status,
            "Transaction created"
        );

        self.insert(Table::Transactions, &TransactionRecord::from_event(&data, &raw))
            .await
            .map_err(|e| {
                error!(transaction_id = ?data.id, error = %e, "Failed to save transaction");
                HandlerError::from(e)
            })?;
        info!(transaction_id = ?data.id, "Transaction saved");
        Ok(())
    }
}
