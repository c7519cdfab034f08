//! HTTP handlers other than the webhook intake
//!
//! - [`read`]: product and subscription lookups
//! - [`status`]: health and metrics

pub mod read;
pub mod status;

pub use read::{check_subscription, customer_subscription, get_subscription, list_products};
pub use status::{health_handler, metrics_handler, status_router, HealthResponse};
