//! Axum handlers for `POST /api/webhook` and `POST /api/paddle/webhook`

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use super::processor::dispatch;
use crate::error::ApiError;
use crate::metrics::{global_metrics, Outcome};
use crate::paddle::events::PaddleEvent;
use crate::paddle::signature::{LEGACY_SIGNATURE_HEADER, SIGNATURE_HEADER};
use crate::server::AppState;

/// Behaviour switches for the webhook endpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookOptions {
    /// Answer 500 instead of 200 when a handler reports a failure, so the
    /// sender redelivers
    pub fail_on_handler_error: bool,
}

/// Signature header value, canonical name first
pub fn signature_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SIGNATURE_HEADER)
        .or_else(|| headers.get(LEGACY_SIGNATURE_HEADER))
        .and_then(|v| v.to_str().ok())
}

/// Verify, parse and dispatch one Paddle notification.
///
/// # Responses
///
/// - `200 {"status":"success"}` once verified, including unknown event types
///   and (unless configured otherwise) handler failures
/// - `401 {"error":"Invalid signature"}` when verification fails; nothing is written
/// - `500 {"error":"Internal server error"}` when the verified body is not an event envelope
#[instrument(skip_all)]
pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    debug!(
        headers = ?headers,
        payload = %String::from_utf8_lossy(&body),
        "Webhook received"
    );

    if let Err(e) = state.verifier.verify(signature_header(&headers), &body) {
        warn!(error = %e, "Webhook signature verification failed");
        global_metrics().record_webhook("unverified", Outcome::Rejected);
        return Err(ApiError::Unauthorized);
    }

    let event = match PaddleEvent::from_bytes(&body) {
        Ok(event) => event,
        Err(e) => {
            global_metrics().record_webhook("unparsed", Outcome::Malformed);
            return Err(ApiError::Internal(e.into()));
        }
    };

    let event_type = event.typed_event_type();
    info!(
        event_id = event.event_id.as_deref().unwrap_or("<missing>"),
        event_type = event.event_type.as_deref().unwrap_or("<missing>"),
        "Processing webhook event"
    );

    match dispatch(state.events.as_ref(), &event).await {
        Ok(()) if event_type.is_known() => {
            global_metrics().record_webhook(event_type.as_str(), Outcome::Processed);
        }
        Ok(()) => {
            global_metrics().record_webhook(event_type.as_str(), Outcome::Ignored);
        }
        Err(e) => {
            global_metrics().record_webhook(event_type.as_str(), Outcome::Failed);
            error!(
                event_id = event.event_id.as_deref().unwrap_or("<missing>"),
                event_type = event_type.as_str(),
                error = %e,
                "Webhook handler failed"
            );
            if state.webhook.fail_on_handler_error {
                return Err(e.into());
            }
        }
    }

    Ok(Json(json!({ "status": "success" })))
}

/// Middleware for the webhook routes: a successful `OPTIONS` answer
/// (normally the CORS preflight) carries `{"status":"ok"}`.
///
/// Must sit outside the CORS layer so the preflight headers are kept.
pub async fn acknowledge_preflight(request: Request, next: Next) -> Response {
    let is_options = request.method() == Method::OPTIONS;
    let response = next.run(request).await;
    if !is_options || !response.status().is_success() {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    (parts, Json(json!({ "status": "ok" }))).into_response()
}
