//! Webhook Intake
//!
//! The HTTP entry point for Paddle notifications and the dispatcher that maps
//! each event onto store writes.
//!
//! A delivery is verified against the raw body before anything is parsed. Once
//! verified it is dispatched by event type; handler failures are logged and, by
//! default, still acknowledged with `200` so Paddle does not redeliver.

pub mod handler;
pub mod processor;

pub use handler::{acknowledge_preflight, webhook_handler, WebhookOptions};
pub use processor::{dispatch, now_timestamp, EventHandler, HandlerResult, MirrorHandler};
