//! Webhook intake through the full router

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use common::{envelope, signed_webhook, verifier, webhook_with_header, ScriptedBilling, TestApp};
use paddle_relay::error::GENERIC_ERROR_MESSAGE;
use paddle_relay::paddle::signature::{LEGACY_SIGNATURE_HEADER, SIGNATURE_HEADER};
use paddle_relay::store::Table;
use paddle_relay::webhook::WebhookOptions;

const WEBHOOK: &str = "/api/webhook";

fn created_data() -> Value {
    json!({
        "id": "sub_01hv8x29kz0t586xy6zn1a62ny",
        "status": "active",
        "customer_id": "ctm_01hv6y1jedq4p1n0yqn5ba3ky4",
        "currency_code": "USD",
        "created_at": "2024-04-12T10:18:47.635628Z",
        "updated_at": "2024-04-12T10:18:47.635628Z",
        "next_billed_at": "2024-05-12T10:18:47.293041Z",
        "items": [
            {
                "status": "active",
                "quantity": 10,
                "next_billed_at": "2024-05-12T10:18:47.293041Z",
                "price": {"id": "pri_01gsz8x8sawmvhz1pv30nge1ke"},
                "product": {"id": "pro_01gsz4t5hdjse780zja8vvr7jg", "name": "AeroEdit Pro"}
            },
            {
                "status": "active",
                "quantity": 1,
                "price": {"id": "pri_01h1vjfevh5etwq3rb416a23h2"},
                "product": {"id": "pro_01h1vjes1y163xfj1rh1tkfb65", "name": "Analytics addon"}
            }
        ]
    })
}

fn seeded(app: &TestApp, id: &str, status: &str) {
    app.store.seed(
        Table::Subscriptions,
        json!({"id": id, "status": status, "customer_id": "ctm_01", "is_active": false}),
    );
}

// ==================== Signature ====================

#[tokio::test]
async fn test_missing_signature_is_rejected() {
    let app = TestApp::new(ScriptedBilling::default());
    let body = envelope("subscription.created", created_data());

    let (status, json) = app
        .send_json(webhook_with_header(WEBHOOK, &body, SIGNATURE_HEADER, None))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json, json!({"error": "Invalid signature"}));
    assert_eq!(app.store.write_count(), 0);
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() {
    let app = TestApp::new(ScriptedBilling::default());
    let body = envelope("transaction.created", json!({"id": "txn_1"}));
    let forged = paddle_relay::SignatureVerifier::new("not-the-secret", std::time::Duration::from_secs(5))
        .sign_header(chrono::Utc::now().timestamp(), body.as_bytes());

    let (status, _) = app
        .send(webhook_with_header(WEBHOOK, &body, SIGNATURE_HEADER, Some(forged)))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.store.rows(Table::Transactions).is_empty());
}

#[tokio::test]
async fn test_tampered_body_is_rejected() {
    let app = TestApp::new(ScriptedBilling::default());
    let body = envelope("transaction.created", json!({"id": "txn_1"}));
    let header = verifier().sign_header(chrono::Utc::now().timestamp(), body.as_bytes());
    let tampered = body.replace("txn_1", "txn_2");

    let (status, _) = app
        .send(webhook_with_header(WEBHOOK, &tampered, SIGNATURE_HEADER, Some(header)))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.write_count(), 0);
}

#[tokio::test]
async fn test_stale_signature_is_rejected() {
    let app = TestApp::new(ScriptedBilling::default());
    let body = envelope("transaction.created", json!({"id": "txn_1"}));
    let header = verifier().sign_header(chrono::Utc::now().timestamp() - 600, body.as_bytes());

    let (status, _) = app
        .send(webhook_with_header(WEBHOOK, &body, SIGNATURE_HEADER, Some(header)))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.write_count(), 0);
}

#[tokio::test]
async fn test_legacy_header_is_accepted() {
    let app = TestApp::new(ScriptedBilling::default());
    let body = envelope("transaction.created", json!({"id": "txn_1"}));
    let header = verifier().sign_header(chrono::Utc::now().timestamp(), body.as_bytes());

    let (status, _) = app
        .send(webhook_with_header(WEBHOOK, &body, LEGACY_SIGNATURE_HEADER, Some(header)))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.rows(Table::Transactions).len(), 1);
}

// ==================== Event mapping ====================

#[tokio::test]
async fn test_subscription_created_mirrors_rows() {
    let app = TestApp::new(ScriptedBilling::default());
    let data = created_data();

    let (status, json) = app
        .send_json(signed_webhook(WEBHOOK, &envelope("subscription.created", data.clone())))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "success"}));

    let subs = app.store.rows(Table::Subscriptions);
    assert_eq!(subs.len(), 1);
    assert_eq!(
        subs[0],
        json!({
            "id": "sub_01hv8x29kz0t586xy6zn1a62ny",
            "customer_id": "ctm_01hv6y1jedq4p1n0yqn5ba3ky4",
            "status": "active",
            "next_billing_date": "2024-05-12T10:18:47.293041Z",
            "currency": "USD",
            "created_at": "2024-04-12T10:18:47.635628Z",
            "updated_at": "2024-04-12T10:18:47.635628Z",
            "items_count": 2,
            "raw_data": data.to_string(),
        })
    );

    let items = app.store.rows(Table::SubscriptionItems);
    assert_eq!(items.len(), 2);
    assert_eq!(
        items[0],
        json!({
            "subscription_id": "sub_01hv8x29kz0t586xy6zn1a62ny",
            "price_id": "pri_01gsz8x8sawmvhz1pv30nge1ke",
            "product_id": "pro_01gsz4t5hdjse780zja8vvr7jg",
            "product_name": "AeroEdit Pro",
            "quantity": 10,
            "status": "active",
            "next_billed_at": "2024-05-12T10:18:47.293041Z",
            "raw_data": data["items"][0].to_string(),
        })
    );
    assert_eq!(items[1]["next_billed_at"], Value::Null);
}

#[tokio::test]
async fn test_duplicate_created_delivery_duplicates_items() {
    let app = TestApp::new(ScriptedBilling::default());
    let body = envelope("subscription.created", created_data());

    for _ in 0..2 {
        let (status, _) = app.send(signed_webhook(WEBHOOK, &body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(app.store.rows(Table::Subscriptions).len(), 1);
    assert_eq!(app.store.rows(Table::SubscriptionItems).len(), 4);
}

#[tokio::test]
async fn test_subscription_lifecycle_patches() {
    let app = TestApp::new(ScriptedBilling::default());
    seeded(&app, "sub_1", "active");

    let (status, _) = app
        .send(signed_webhook(
            WEBHOOK,
            &envelope("subscription.updated", json!({"id": "sub_1", "status": "past_due"})),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.rows(Table::Subscriptions)[0]["status"], "past_due");

    let (status, _) = app
        .send(signed_webhook(
            WEBHOOK,
            &envelope(
                "subscription.renewed",
                json!({"id": "sub_1", "next_billed_at": "2024-07-01T00:00:00Z"}),
            ),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.store.rows(Table::Subscriptions)[0]["next_billing_date"],
        "2024-07-01T00:00:00Z"
    );

    let canceled = json!({"id": "sub_1", "status": "canceled", "canceled_at": "2024-06-15T08:00:00Z"});
    let (status, _) = app
        .send(signed_webhook(
            WEBHOOK,
            &envelope("subscription.canceled", canceled.clone()),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let row = &app.store.rows(Table::Subscriptions)[0];
    assert_eq!(row["status"], "canceled");
    assert_eq!(row["is_active"], false);
    assert_eq!(row["canceled_at"], "2024-06-15T08:00:00Z");
    assert_eq!(row["raw_data"], canceled.to_string());
    assert_eq!(row["customer_id"], "ctm_01");
}

#[tokio::test]
async fn test_activation_takes_status_from_provider() {
    let app = TestApp::new(ScriptedBilling::default().with_subscription("sub_1", "active"));
    seeded(&app, "sub_1", "trialing");

    let (status, _) = app
        .send(signed_webhook(
            "/api/paddle/webhook",
            &envelope("subscription.activated", json!({"id": "sub_1", "status": "trialing"})),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.billing.lookups(), 1);
    let row = &app.store.rows(Table::Subscriptions)[0];
    assert_eq!(row["status"], "active");
    assert_eq!(row["is_active"], true);
}

#[tokio::test]
async fn test_activation_lookup_failure_still_acknowledged() {
    let app = TestApp::new(ScriptedBilling::failing());
    seeded(&app, "sub_1", "trialing");

    let (status, json) = app
        .send_json(signed_webhook(
            WEBHOOK,
            &envelope("subscription.activated", json!({"id": "sub_1"})),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "success"}));
    assert_eq!(app.store.write_count(), 0);
    assert_eq!(app.store.rows(Table::Subscriptions)[0]["status"], "trialing");
}

#[tokio::test]
async fn test_handler_failure_surfaces_when_configured() {
    let app = TestApp::with_options(
        ScriptedBilling::failing(),
        WebhookOptions {
            fail_on_handler_error: true,
        },
    );
    seeded(&app, "sub_1", "trialing");

    let (status, json) = app
        .send_json(signed_webhook(
            WEBHOOK,
            &envelope("subscription.activated", json!({"id": "sub_1"})),
        ))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({"error": GENERIC_ERROR_MESSAGE}));
    assert_eq!(app.store.write_count(), 0);
}

#[tokio::test]
async fn test_update_for_unknown_subscription_is_acknowledged() {
    let app = TestApp::new(ScriptedBilling::default());

    let (status, _) = app
        .send(signed_webhook(
            WEBHOOK,
            &envelope("subscription.updated", json!({"id": "sub_missing", "status": "paused"})),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(app.store.rows(Table::Subscriptions).is_empty());
}

#[tokio::test]
async fn test_transaction_created() {
    let app = TestApp::new(ScriptedBilling::default());
    let data = json!({
        "id": "txn_01hv8wptq8987qeep44cyrewp9",
        "status": "billed",
        "subscription_id": "sub_1",
        "currency_code": "EUR",
        "created_at": "2024-04-12T10:12:33.2014Z",
        "updated_at": "2024-04-12T10:12:33.2014Z",
        "details": {"totals": {"total": "59900", "tax": "9900"}}
    });

    let (status, _) = app
        .send(signed_webhook(WEBHOOK, &envelope("transaction.created", data.clone())))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.store.rows(Table::Transactions),
        vec![json!({
            "id": "txn_01hv8wptq8987qeep44cyrewp9",
            "subscription_id": "sub_1",
            "status": "billed",
            "amount": "59900",
            "currency": "EUR",
            "created_at": "2024-04-12T10:12:33.2014Z",
            "updated_at": "2024-04-12T10:12:33.2014Z",
            "raw_data": data.to_string(),
        })]
    );
}

// ==================== Envelope edge cases ====================

#[tokio::test]
async fn test_unknown_event_type_is_acknowledged_without_writes() {
    let app = TestApp::new(ScriptedBilling::default());

    let (status, json) = app
        .send_json(signed_webhook(
            WEBHOOK,
            &envelope("customer.updated", json!({"id": "ctm_1"})),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "success"}));
    assert_eq!(app.store.write_count(), 0);
    assert_eq!(app.billing.lookups(), 0);
}

#[tokio::test]
async fn test_non_string_envelope_fields_are_acknowledged() {
    let app = TestApp::new(ScriptedBilling::default());

    for body in [
        json!({"event_type": 42, "data": {}}),
        json!({"event_id": 7, "event_type": ["subscription.created"], "occurred_at": false, "notification_id": {}, "data": {"id": "sub_1"}}),
    ] {
        let (status, json) = app
            .send_json(signed_webhook(WEBHOOK, &body.to_string()))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"status": "success"}));
    }
    assert_eq!(app.store.write_count(), 0);
    assert_eq!(app.billing.lookups(), 0);
}

#[tokio::test]
async fn test_activation_without_billing_period_leaves_row() {
    let app = TestApp::new(
        ScriptedBilling::default()
            .with_subscription("sub_1", "active")
            .without_billing_period("sub_1"),
    );
    seeded(&app, "sub_1", "trialing");

    let (status, json) = app
        .send_json(signed_webhook(
            WEBHOOK,
            &envelope("subscription.activated", json!({"id": "sub_1"})),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "success"}));
    assert_eq!(app.billing.lookups(), 1);
    assert_eq!(app.store.write_count(), 0);
    assert_eq!(app.store.rows(Table::Subscriptions)[0]["status"], "trialing");
}

#[tokio::test]
async fn test_signed_garbage_is_internal_error() {
    let app = TestApp::new(ScriptedBilling::default());

    let (status, json) = app.send_json(signed_webhook(WEBHOOK, "not json {")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({"error": GENERIC_ERROR_MESSAGE}));
    assert_eq!(app.store.write_count(), 0);
}

#[tokio::test]
async fn test_options_on_webhook_paths() {
    let app = TestApp::new(ScriptedBilling::default());

    for path in ["/api/webhook", "/api/paddle/webhook"] {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let (status, json) = app.send_json(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"status": "ok"}));
    }
}
