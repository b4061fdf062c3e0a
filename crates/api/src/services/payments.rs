//! Payments against orders, and Stripe webhook handling.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;
use serde::Serialize;
use tracing::instrument;

use storeline_core::{CurrencyCode, Money, OrderId, OrderStatus, PaymentStatus, UserId};

use super::ensure_owner;
use crate::db::{OrderRepository, PaymentRepository, with_timeout};
use crate::error::{AppError, Result};
use crate::models::{CreatedPayment, NewPayment, Payment};
use crate::pagination::{Page, Pagination};
use crate::stripe::{CreatePaymentIntent, EventKind, PaymentProvider, StripeError, webhook};

/// Acknowledgement returned to Stripe for a verified event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookReceipt {
    pub received: bool,
    pub event_id: String,
    /// Whether the event changed a local payment.
    pub handled: bool,
}

/// Payment operations.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Create a provider payment intent for one of the caller's pending orders.
    async fn create(
        &self,
        user_id: UserId,
        order_id: OrderId,
        currency: Option<CurrencyCode>,
    ) -> Result<CreatedPayment>;

    async fn list(&self, user_id: UserId, page: Pagination) -> Result<Page<Payment>>;

    async fn get(&self, user_id: UserId, id: &str) -> Result<Payment>;

    async fn confirm(
        &self,
        user_id: UserId,
        id: &str,
        payment_method: Option<&str>,
    ) -> Result<Payment>;

    /// Refund a succeeded payment in full.
    async fn refund(&self, user_id: UserId, id: &str) -> Result<Payment>;

    /// Verify and apply a Stripe webhook delivery.
    ///
    /// A missing signature fails before any verification work is done.
    async fn handle_webhook(&self, payload: &[u8], signature: Option<&str>)
    -> Result<WebhookReceipt>;
}

/// [`PaymentService`] backed by a [`PaymentProvider`].
pub struct PaymentServiceImpl {
    payments: Arc<dyn PaymentRepository>,
    orders: Arc<dyn OrderRepository>,
    provider: Arc<dyn PaymentProvider>,
    webhook_secret: SecretString,
}

impl PaymentServiceImpl {
    #[must_use]
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        orders: Arc<dyn OrderRepository>,
        provider: Arc<dyn PaymentProvider>,
        webhook_secret: SecretString,
    ) -> Self {
        Self {
            payments,
            orders,
            provider,
            webhook_secret,
        }
    }

    async fn owned(&self, user_id: UserId, id: &str) -> Result<Payment> {
        let payment = with_timeout(self.payments.get(id))
            .await?
            .ok_or_else(|| AppError::not_found("payment not found"))?;
        ensure_owner(payment.user_id, user_id, "payment")?;
        Ok(payment)
    }

    async fn set_status(&self, id: &str, status: PaymentStatus) -> Result<Payment> {
        with_timeout(self.payments.update_status(id, status))
            .await?
            .ok_or_else(|| AppError::not_found("payment not found"))
    }
}

#[async_trait]
impl PaymentService for PaymentServiceImpl {
    #[instrument(skip(self))]
    async fn create(
        &self,
        user_id: UserId,
        order_id: OrderId,
        currency: Option<CurrencyCode>,
    ) -> Result<CreatedPayment> {
        let order = with_timeout(self.orders.get(order_id))
            .await?
            .ok_or_else(|| AppError::not_found("order not found"))?;
        ensure_owner(order.user_id, user_id, "order")?;

        if order.status != OrderStatus::Pending {
            return Err(AppError::bad_request(format!(
                "order is {}, only pending orders can be paid",
                order.status.as_str()
            )));
        }
        if let Some(requested) = currency.filter(|c| *c != order.currency) {
            return Err(AppError::bad_request("currency does not match order")
                .with_detail(format!("order is in {}, got {requested}", order.currency)));
        }

        let amount = Money::new(order.total, order.currency)
            .to_minor_units()
            .map_err(|e| AppError::bad_request("order total cannot be charged").with_source(e))?;

        let intent = self
            .provider
            .create_payment_intent(CreatePaymentIntent {
                amount,
                currency: order.currency.as_str().to_owned(),
                metadata: vec![
                    ("order_id".to_owned(), order.id.to_string()),
                    ("user_id".to_owned(), user_id.to_string()),
                ],
            })
            .await?;

        let payment = with_timeout(self.payments.create(NewPayment {
            id: intent.id.clone(),
            order_id: order.id,
            user_id,
            amount,
            currency: order.currency,
            status: intent.payment_status()?,
        }))
        .await?;

        tracing::info!(payment_id = %payment.id, order_id = %order.id, amount, "Payment intent created");
        Ok(CreatedPayment {
            payment,
            client_secret: intent.client_secret,
        })
    }

    #[instrument(skip(self))]
    async fn list(&self, user_id: UserId, page: Pagination) -> Result<Page<Payment>> {
        let (items, total) = with_timeout(self.payments.list_for_user(user_id, page)).await?;
        Ok(Page::new(items, page, total))
    }

    #[instrument(skip(self))]
    async fn get(&self, user_id: UserId, id: &str) -> Result<Payment> {
        self.owned(user_id, id).await
    }

    #[instrument(skip(self))]
    async fn confirm(
        &self,
        user_id: UserId,
        id: &str,
        payment_method: Option<&str>,
    ) -> Result<Payment> {
        let payment = self.owned(user_id, id).await?;
        let intent = self
            .provider
            .confirm_payment_intent(&payment.id, payment_method)
            .await?;
        let updated = self.set_status(&payment.id, intent.payment_status()?).await?;
        tracing::info!(payment_id = %updated.id, status = updated.status.as_str(), "Payment confirmed");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn refund(&self, user_id: UserId, id: &str) -> Result<Payment> {
        let payment = self.owned(user_id, id).await?;
        if payment.status != PaymentStatus::Succeeded {
            return Err(AppError::bad_request(format!(
                "payment is {}, only succeeded payments can be refunded",
                payment.status.as_str()
            )));
        }

        let refund = self.provider.refund_payment_intent(&payment.id).await?;
        tracing::info!(payment_id = %payment.id, refund_id = %refund.id, "Payment refunded");
        self.set_status(&payment.id, PaymentStatus::Refunded).await
    }

    #[instrument(skip_all)]
    async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookReceipt> {
        let signature = signature.ok_or(StripeError::MissingSignature)?;
        let event = webhook::construct_event(
            payload,
            signature,
            &self.webhook_secret,
            Utc::now().timestamp(),
        )?;

        let mut receipt = WebhookReceipt {
            received: true,
            event_id: event.id.clone(),
            handled: false,
        };

        let Some(kind) = EventKind::from_event_type(&event.event_type) else {
            tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring webhook event");
            return Ok(receipt);
        };
        let Some(intent_id) = event.payment_intent_id() else {
            tracing::warn!(event_id = %event.id, event_type = %event.event_type, "Webhook event without payment intent");
            return Ok(receipt);
        };

        let status = kind.resulting_status();
        match with_timeout(self.payments.update_status(intent_id, status)).await? {
            Some(payment) => {
                tracing::info!(
                    event_id = %event.id,
                    payment_id = %payment.id,
                    status = status.as_str(),
                    "Payment updated from webhook"
                );
                receipt.handled = true;
            }
            None => {
                tracing::warn!(event_id = %event.id, intent_id, "Webhook for unknown payment intent");
            }
        }
        Ok(receipt)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use secrecy::ExposeSecret;
    use storeline_core::ProductId;

    use super::*;
    use crate::db::memory::{InMemoryOrderRepository, InMemoryPaymentRepository};
    use crate::error::ErrorCode;
    use crate::models::{NewOrder, Order, OrderItem, ShippingAddress};
    use crate::stripe::FakePaymentProvider;

    const WEBHOOK_SECRET: &str = "whsec_test_secret";

    struct Fixture {
        service: PaymentServiceImpl,
        orders: Arc<InMemoryOrderRepository>,
        provider: Arc<FakePaymentProvider>,
    }

    fn fixture() -> Fixture {
        let orders = Arc::new(InMemoryOrderRepository::default());
        let provider = Arc::new(FakePaymentProvider::new());
        Fixture {
            service: PaymentServiceImpl::new(
                Arc::new(InMemoryPaymentRepository::default()),
                orders.clone(),
                provider.clone(),
                SecretString::from(WEBHOOK_SECRET),
            ),
            orders,
            provider,
        }
    }

    async fn order(orders: &InMemoryOrderRepository, user_id: UserId) -> Order {
        orders
            .create(NewOrder {
                user_id,
                shipping_address: ShippingAddress {
                    line1: "1 Main St".to_owned(),
                    line2: None,
                    city: "Springfield".to_owned(),
                    state: None,
                    postal_code: "62701".to_owned(),
                    country: "US".to_owned(),
                },
                items: vec![OrderItem {
                    product_id: ProductId::new(),
                    quantity: 2,
                    unit_price: Decimal::new(1099, 2),
                    total: Decimal::new(2198, 2),
                }],
                total: Decimal::new(2198, 2),
                currency: CurrencyCode::Usd,
            })
            .await
            .unwrap()
    }

    fn signed(payload: &str) -> String {
        let secret = SecretString::from(WEBHOOK_SECRET);
        webhook::signature_header(
            payload.as_bytes(),
            secret.expose_secret(),
            Utc::now().timestamp(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_charges_order_total_in_cents() {
        let f = fixture();
        let user = UserId::new();
        let order = order(&f.orders, user).await;

        let created = f.service.create(user, order.id, None).await.unwrap();
        assert_eq!(created.payment.amount, 2198);
        assert_eq!(created.payment.status, PaymentStatus::RequiresPaymentMethod);
        assert!(created.client_secret.is_some());

        let sent = f.provider.created();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].currency, "usd");
        assert!(sent[0]
            .metadata
            .contains(&("order_id".to_owned(), order.id.to_string())));
    }

    #[tokio::test]
    async fn test_create_rejections() {
        let f = fixture();
        let user = UserId::new();
        let order = order(&f.orders, user).await;

        let err = f.service.create(UserId::new(), order.id, None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let err = f
            .service
            .create(user, order.id, Some(CurrencyCode::Eur))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);

        f.orders
            .update_status(order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        let err = f.service.create(user, order.id, None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[tokio::test]
    async fn test_provider_failure_is_third_party_error() {
        let f = fixture();
        let user = UserId::new();
        let order = order(&f.orders, user).await;
        f.provider.fail_requests(true);

        let err = f.service.create(user, order.id, None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ThirdParty);
    }

    #[tokio::test]
    async fn test_confirm_then_refund() {
        let f = fixture();
        let user = UserId::new();
        let order = order(&f.orders, user).await;
        let id = f.service.create(user, order.id, None).await.unwrap().payment.id;

        let err = f.service.refund(user, &id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);

        let confirmed = f.service.confirm(user, &id, Some("pm_card_visa")).await.unwrap();
        assert_eq!(confirmed.status, PaymentStatus::Succeeded);

        let refunded = f.service.refund(user, &id).await.unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn test_webhook_requires_signature() {
        let err = fixture()
            .service
            .handle_webhook(b"{}", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[tokio::test]
    async fn test_webhook_rejects_bad_signature() {
        let payload = r#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{}}}"#;
        let err = fixture()
            .service
            .handle_webhook(payload.as_bytes(), Some("t=1,v1=deadbeef"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[tokio::test]
    async fn test_webhook_updates_payment() {
        let f = fixture();
        let user = UserId::new();
        let order = order(&f.orders, user).await;
        let id = f.service.create(user, order.id, None).await.unwrap().payment.id;

        let payload = serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {"object": {"object": "payment_intent", "id": id}}
        })
        .to_string();
        let receipt = f
            .service
            .handle_webhook(payload.as_bytes(), Some(&signed(&payload)))
            .await
            .unwrap();
        assert!(receipt.handled);
        assert_eq!(
            f.service.get(user, &id).await.unwrap().status,
            PaymentStatus::Succeeded
        );
    }

    #[tokio::test]
    async fn test_webhook_acknowledges_unhandled_events() {
        let f = fixture();
        let unknown_type = r#"{"id":"evt_2","type":"customer.created","data":{"object":{}}}"#;
        let receipt = f
            .service
            .handle_webhook(unknown_type.as_bytes(), Some(&signed(unknown_type)))
            .await
            .unwrap();
        assert!(!receipt.handled);

        let unknown_intent = r#"{"id":"evt_3","type":"payment_intent.canceled","data":{"object":{"object":"payment_intent","id":"pi_missing"}}}"#;
        let receipt = f
            .service
            .handle_webhook(unknown_intent.as_bytes(), Some(&signed(unknown_intent)))
            .await
            .unwrap();
        assert!(!receipt.handled);
        assert_eq!(receipt.event_id, "evt_3");
    }
}
