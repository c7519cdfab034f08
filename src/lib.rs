//! Paddle Relay - Paddle Billing Webhook Receiver
//!
//! This crate receives Paddle Billing notifications, verifies their
//! signatures, and mirrors subscription and transaction state into a
//! Supabase (PostgREST) table store. It also serves a handful of read
//! endpoints over that state and the Paddle API.
//!
//! # Features
//!
//! - **Signature Verification**: HMAC-SHA256 over `ts:body` with a replay window
//! - **Event Dispatch**: Six subscription and transaction events, unknown types acknowledged
//! - **Table Mirroring**: Inserts and patches against `subscriptions`, `subscription_items`, `transactions`
//! - **Read Endpoints**: Products, subscription lookup, active-subscription checks
//!
//! # Architecture
//!
//! ```text
//! Paddle ──▶ POST /api/webhook ──▶ SignatureVerifier ──▶ dispatch ──▶ MirrorHandler
//!                                                                        │      │
//!                                                                        ▼      ▼
//!                                                               EventStore  BillingClient
//!                                                               (Supabase)  (Paddle API)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use paddle_relay::config::Config;
//! use paddle_relay::cors::cors_layer;
//! use paddle_relay::server::{router, serve, AppState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env(false)?;
//!     let state = Arc::new(AppState::from_config(&config)?);
//!
//!     serve("0.0.0.0:5000".parse()?, router(state, cors_layer())).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod paddle;
pub mod server;
pub mod store;
pub mod webhook;

// Re-exports for convenience
pub use error::{ApiError, Error, Result};
pub use paddle::{BillingClient, PaddleClient, PaddleEvent, PaddleEventType, SignatureVerifier};
pub use server::{router, AppState};
pub use store::{EventStore, InMemoryStore, PostgrestStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
