//! Integration tests for Storeline.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process router tests (in-memory repositories, fake Stripe and SMTP)
//! cargo test -p storeline-integration-tests
//!
//! # Smoke test against a running server
//! STORELINE_BASE_URL=http://localhost:8080 cargo test -p storeline-integration-tests -- --ignored
//! ```
//!
//! [`TestApp`] builds the full router, middleware included, over
//! in-memory backends and drives it with `tower::ServiceExt::oneshot`.

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use storeline_api::auth::TokenService;
use storeline_api::email::FakeEmailSender;
use storeline_api::state::{AppState, Backends, StateSettings};
use storeline_api::stripe::FakePaymentProvider;
use storeline_core::CurrencyCode;

pub const JWT_SECRET: &str = "it-Xr7!pQ2#vL9$wM4@kS8^nB3&hT6*zY1";
pub const WEBHOOK_SECRET: &str = "whsec_integration_secret";

/// Response with the body parsed as JSON (`Value::Null` when empty).
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `data` member of a success envelope.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    /// The `error.code` member of a failure envelope.
    #[must_use]
    pub fn error_code(&self) -> &str {
        self.body["error"]["code"].as_str().unwrap_or_default()
    }
}

pub struct TestApp {
    router: Router,
    pub tokens: TokenService,
    pub payments: Arc<FakePaymentProvider>,
    pub mailer: Arc<FakeEmailSender>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let payments = Arc::new(FakePaymentProvider::new());
        let mailer = Arc::new(FakeEmailSender::new());
        let tokens = TokenService::new(
            &SecretString::from(JWT_SECRET),
            Duration::from_secs(3600),
        );

        let state = AppState::new(
            Backends::in_memory(payments.clone(), mailer.clone()),
            StateSettings {
                tokens: tokens.clone(),
                webhook_secret: SecretString::from(WEBHOOK_SECRET),
                default_currency: CurrencyCode::Usd,
            },
            None,
        );

        Self {
            router: storeline_api::app(state),
            tokens,
            payments,
            mailer,
        }
    }

    /// Send one request through the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let Ok(response) = self.router.clone().oneshot(request).await;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Response body is not JSON")
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// JSON request with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("Failed to build request"))
            .await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Register `email` and return a bearer token for it.
    pub async fn login_as(&self, email: &str) -> String {
        let registered = self
            .post(
                "/users/register",
                None,
                json!({"email": email, "password": "correct-horse-battery", "name": "Test User"}),
            )
            .await;
        assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.body);

        let login = self
            .post(
                "/users/login",
                None,
                json!({"email": email, "password": "correct-horse-battery"}),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK, "{:?}", login.body);
        login.data()["token"]
            .as_str()
            .expect("Login response has no token")
            .to_owned()
    }

    /// Create a product and return its id.
    pub async fn create_product(&self, token: &str, name: &str, price: &str) -> String {
        let created = self
            .post(
                "/products",
                Some(token),
                json!({"name": name, "price": price, "stock": 50}),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
        created.data()["id"]
            .as_str()
            .expect("Product response has no id")
            .to_owned()
    }

    /// Add `quantity` of `product_id` to the caller's cart.
    pub async fn add_to_cart(&self, token: &str, product_id: &str, quantity: u32) -> TestResponse {
        self.post(
            "/carts/items",
            Some(token),
            json!({"productId": product_id, "quantity": quantity}),
        )
        .await
    }

    /// Check out the caller's cart and return the order id.
    pub async fn place_order(&self, token: &str) -> String {
        let placed = self
            .post(
                "/orders",
                Some(token),
                json!({"shippingAddress": shipping_address()}),
            )
            .await;
        assert_eq!(placed.status, StatusCode::CREATED, "{:?}", placed.body);
        placed.data()["id"]
            .as_str()
            .expect("Order response has no id")
            .to_owned()
    }
}

/// A valid shipping address body.
#[must_use]
pub fn shipping_address() -> Value {
    json!({
        "line1": "1 Market St",
        "city": "San Francisco",
        "state": "CA",
        "postalCode": "94105",
        "country": "US"
    })
}
