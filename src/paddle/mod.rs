// Allow missing docs in this module - entity fields mirror Paddle's API reference
#![allow(missing_docs)]

//! Paddle Billing Integration
//!
//! Everything the relay knows about Paddle:
//!
//! - **Signature Verification**: HMAC-SHA256 validation of the `Paddle-Signature` header
//! - **Event Envelope**: Typed event kinds over the raw notification JSON
//! - **API Client**: Subscription lookup and product listing over Paddle's REST API
//!
//! # Architecture
//!
//! ```text
//! Request -> Signature Verify -> Parse Envelope -> Dispatch -> Ack (200)
//!                   |                  |                |
//!                   v                  v                v
//!                  401                500        Store writes / API lookup
//! ```

pub mod client;
pub mod events;
pub mod signature;

pub use client::{BillingClient, BillingPeriod, PaddleClient, Product, Subscription};
pub use events::{PaddleEvent, PaddleEventType, SubscriptionData, TransactionData};
pub use signature::{SignatureHeader, SignatureVerifier, LEGACY_SIGNATURE_HEADER, SIGNATURE_HEADER};
