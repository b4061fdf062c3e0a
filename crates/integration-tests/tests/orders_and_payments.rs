//! Checkout, order ownership, payments and the Stripe webhook.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use serde_json::json;

use storeline_api::stripe::webhook::{SIGNATURE_HEADER, signature_header};
use storeline_integration_tests::{TestApp, TestResponse, WEBHOOK_SECRET, shipping_address};

/// A shopper with two mugs at 10.99 in the cart, checked out.
async fn placed_order(app: &TestApp) -> (String, String) {
    let token = app.login_as("shopper@example.com").await;
    let product = app.create_product(&token, "Ceramic Mug", "10.99").await;
    app.add_to_cart(&token, &product, 2).await;
    let order = app.place_order(&token).await;
    (token, order)
}

async fn post_webhook(app: &TestApp, payload: &str, signature: Option<String>) -> TestResponse {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/payments/webhook")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    app.send(builder.body(Body::from(payload.to_owned())).expect("request builds"))
        .await
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
async fn test_checkout_totals_and_clears_cart() {
    let app = TestApp::new();
    let (token, order) = placed_order(&app).await;

    let shown = app.get(&format!("/orders/{order}"), Some(&token)).await;
    assert_eq!(shown.status, StatusCode::OK);
    assert_eq!(shown.data()["total"], "21.98");
    assert_eq!(shown.data()["currency"], "usd");
    assert_eq!(shown.data()["status"], "pending");
    assert_eq!(shown.data()["shippingAddress"]["postalCode"], "94105");

    let cart = app.get("/carts", Some(&token)).await;
    assert_eq!(cart.data()["items"].as_array().map(Vec::len), Some(0));

    let listed = app.get("/orders", Some(&token)).await;
    assert_eq!(listed.data()["total"], 1);
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let app = TestApp::new();
    let token = app.login_as("shopper@example.com").await;
    let response = app
        .post("/orders", Some(&token), json!({"shippingAddress": shipping_address()}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "BAD_REQUEST");
}

#[tokio::test]
async fn test_invalid_address_is_validation_error() {
    let app = TestApp::new();
    let token = app.login_as("shopper@example.com").await;
    let response = app
        .post(
            "/orders",
            Some(&token),
            json!({"shippingAddress": {"line1": "", "city": "Paris", "postalCode": "75001", "country": "France"}}),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "VALIDATION_ERROR");
    assert_eq!(
        response.body["error"]["details"].as_array().map(Vec::len),
        Some(2)
    );
}

#[tokio::test]
async fn test_other_users_order_is_forbidden() {
    let app = TestApp::new();
    let (_, order) = placed_order(&app).await;
    let stranger = app.login_as("stranger@example.com").await;

    let response = app.get(&format!("/orders/{order}"), Some(&stranger)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), "FORBIDDEN");
}

#[tokio::test]
async fn test_status_transitions() {
    let app = TestApp::new();
    let (token, order) = placed_order(&app).await;
    let uri = format!("/orders/{order}/status");

    let shipped = app
        .request(Method::PATCH, &uri, Some(&token), Some(json!({"status": "shipping"})))
        .await;
    assert_eq!(shipped.status, StatusCode::OK);
    assert_eq!(shipped.data()["status"], "shipping");

    let backwards = app
        .request(Method::PATCH, &uri, Some(&token), Some(json!({"status": "pending"})))
        .await;
    assert_eq!(backwards.status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Payments
// ============================================================================

#[tokio::test]
async fn test_payment_lifecycle_through_webhook() {
    let app = TestApp::new();
    let (token, order) = placed_order(&app).await;

    let created = app
        .post("/payments", Some(&token), json!({"orderId": order}))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    assert_eq!(created.data()["amount"], 2198);
    assert_eq!(created.data()["status"], "requires_payment_method");
    assert!(created.data()["clientSecret"].is_string());
    let payment_id = created.data()["id"]
        .as_str()
        .expect("payment has an id")
        .to_owned();

    let intents = app.payments.created();
    assert_eq!(intents.len(), 1);
    assert_eq!(intents[0].amount, 2198);

    let payload = json!({
        "id": "evt_1",
        "type": "payment_intent.succeeded",
        "data": {"object": {"id": payment_id, "object": "payment_intent"}}
    })
    .to_string();
    let signature = signature_header(payload.as_bytes(), WEBHOOK_SECRET, Utc::now().timestamp())
        .expect("signature computes");

    let receipt = post_webhook(&app, &payload, Some(signature)).await;
    assert_eq!(receipt.status, StatusCode::OK);
    assert_eq!(receipt.data()["received"], true);
    assert_eq!(receipt.data()["handled"], true);

    let shown = app.get(&format!("/payments/{payment_id}"), Some(&token)).await;
    assert_eq!(shown.data()["status"], "succeeded");

    let refunded = app
        .post(&format!("/payments/{payment_id}/refund"), Some(&token), json!({}))
        .await;
    assert_eq!(refunded.status, StatusCode::OK);
    assert_eq!(refunded.data()["status"], "refunded");
}

#[tokio::test]
async fn test_confirm_payment() {
    let app = TestApp::new();
    let (token, order) = placed_order(&app).await;
    let created = app
        .post("/payments", Some(&token), json!({"orderId": order}))
        .await;
    let payment_id = created.data()["id"].as_str().expect("payment has an id").to_owned();

    let confirmed = app
        .post(
            &format!("/payments/{payment_id}/confirm"),
            Some(&token),
            json!({"paymentMethod": "pm_card_visa"}),
        )
        .await;
    assert_eq!(confirmed.status, StatusCode::OK);
    assert_eq!(confirmed.data()["status"], "succeeded");
}

#[tokio::test]
async fn test_provider_failure_is_bad_gateway() {
    let app = TestApp::new();
    let (token, order) = placed_order(&app).await;
    app.payments.fail_requests(true);

    let response = app
        .post("/payments", Some(&token), json!({"orderId": order}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.error_code(), "THIRD_PARTY_ERROR");
}

#[tokio::test]
async fn test_paying_someone_elses_order_is_forbidden() {
    let app = TestApp::new();
    let (_, order) = placed_order(&app).await;
    let stranger = app.login_as("stranger@example.com").await;

    let response = app
        .post("/payments", Some(&stranger), json!({"orderId": order}))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

// ============================================================================
// Webhook
// ============================================================================

#[tokio::test]
async fn test_webhook_without_signature_is_rejected() {
    let app = TestApp::new();
    let response = post_webhook(&app, r#"{"id":"evt_1","type":"ping","data":{"object":{}}}"#, None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_webhook_with_wrong_signature_is_rejected() {
    let app = TestApp::new();
    let payload = r#"{"id":"evt_1","type":"ping","data":{"object":{}}}"#;
    let signature = signature_header(payload.as_bytes(), "whsec_someone_else", Utc::now().timestamp())
        .expect("signature computes");

    let response = post_webhook(&app, payload, Some(signature)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_event_is_acknowledged_unhandled() {
    let app = TestApp::new();
    let payload = r#"{"id":"evt_2","type":"customer.created","data":{"object":{"id":"cus_1"}}}"#;
    let signature = signature_header(payload.as_bytes(), WEBHOOK_SECRET, Utc::now().timestamp())
        .expect("signature computes");

    let response = post_webhook(&app, payload, Some(signature)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["eventId"], "evt_2");
    assert_eq!(response.data()["handled"], false);
}
