//! Stripe REST client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::StripeError;
use super::types::{ApiErrorResponse, CreatePaymentIntent, PaymentIntent, Refund};
use crate::config::StripeConfig;

/// Payment operations the payment service depends on.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a payment intent.
    async fn create_payment_intent(
        &self,
        params: CreatePaymentIntent,
    ) -> Result<PaymentIntent, StripeError>;

    /// Confirm an intent, optionally attaching a payment method.
    async fn confirm_payment_intent(
        &self,
        id: &str,
        payment_method: Option<&str>,
    ) -> Result<PaymentIntent, StripeError>;

    /// Refund the full captured amount of an intent.
    async fn refund_payment_intent(&self, id: &str) -> Result<Refund, StripeError>;
}

/// Stripe API client (form-encoded requests, JSON responses).
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth = HeaderValue::from_str(&auth_value)
            .map_err(|e| StripeError::Parse(format!("Invalid API key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("Authorization", auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, StripeError> {
        let url = format!("{}/{path}", self.api_base);
        let response = self.client.post(&url).form(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body).map_or(body, |e| {
                let kind = e.error.error_type.unwrap_or_default();
                let message = e.error.message.unwrap_or_default();
                format!("{kind}: {message}")
            });
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| StripeError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[instrument(skip(self, params), fields(amount = params.amount, currency = %params.currency))]
    async fn create_payment_intent(
        &self,
        params: CreatePaymentIntent,
    ) -> Result<PaymentIntent, StripeError> {
        let mut form = vec![
            ("amount".to_owned(), params.amount.to_string()),
            ("currency".to_owned(), params.currency),
            (
                "automatic_payment_methods[enabled]".to_owned(),
                "true".to_owned(),
            ),
            (
                "automatic_payment_methods[allow_redirects]".to_owned(),
                "never".to_owned(),
            ),
        ];
        form.extend(
            params
                .metadata
                .into_iter()
                .map(|(key, value)| (format!("metadata[{key}]"), value)),
        );

        self.post_form("payment_intents", &form).await
    }

    #[instrument(skip(self))]
    async fn confirm_payment_intent(
        &self,
        id: &str,
        payment_method: Option<&str>,
    ) -> Result<PaymentIntent, StripeError> {
        let form: Vec<(String, String)> = payment_method
            .map(|pm| ("payment_method".to_owned(), pm.to_owned()))
            .into_iter()
            .collect();

        self.post_form(&format!("payment_intents/{id}/confirm"), &form)
            .await
    }

    #[instrument(skip(self))]
    async fn refund_payment_intent(&self, id: &str) -> Result<Refund, StripeError> {
        let form = [("payment_intent".to_owned(), id.to_owned())];
        self.post_form("refunds", &form).await
    }
}
