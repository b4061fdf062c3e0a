//! Scriptable in-process [`PaymentProvider`] for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use super::types::{CreatePaymentIntent, PaymentIntent, Refund};
use super::{PaymentProvider, StripeError};

/// Fake provider that answers like Stripe's happy path.
///
/// Intents start `requires_payment_method`, confirmation succeeds and refunds
/// succeed. [`FakePaymentProvider::fail_requests`] makes every call return an
/// API error instead.
#[derive(Debug, Default)]
pub struct FakePaymentProvider {
    next_id: AtomicU64,
    failing: AtomicBool,
    created: Mutex<Vec<CreatePaymentIntent>>,
}

impl FakePaymentProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail (or succeed again).
    pub fn fail_requests(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Parameters of every intent created so far.
    #[must_use]
    pub fn created(&self) -> Vec<CreatePaymentIntent> {
        self.created
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), StripeError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StripeError::Api {
                status: 402,
                message: "card_error: Your card was declined.".to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for FakePaymentProvider {
    async fn create_payment_intent(
        &self,
        params: CreatePaymentIntent,
    ) -> Result<PaymentIntent, StripeError> {
        self.check()?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("pi_fake_{n}");
        let intent = PaymentIntent {
            client_secret: Some(format!("{id}_secret_fake")),
            id,
            amount: params.amount,
            currency: params.currency.clone(),
            status: "requires_payment_method".to_owned(),
            metadata: params.metadata.iter().cloned().collect(),
        };
        if let Ok(mut created) = self.created.lock() {
            created.push(params);
        }
        Ok(intent)
    }

    async fn confirm_payment_intent(
        &self,
        id: &str,
        _payment_method: Option<&str>,
    ) -> Result<PaymentIntent, StripeError> {
        self.check()?;
        Ok(PaymentIntent {
            id: id.to_owned(),
            amount: 0,
            currency: "usd".to_owned(),
            status: "succeeded".to_owned(),
            client_secret: None,
            metadata: std::collections::HashMap::new(),
        })
    }

    async fn refund_payment_intent(&self, id: &str) -> Result<Refund, StripeError> {
        self.check()?;
        Ok(Refund {
            id: format!("re_fake_{id}"),
            status: "succeeded".to_owned(),
            payment_intent: Some(id.to_owned()),
        })
    }
}
