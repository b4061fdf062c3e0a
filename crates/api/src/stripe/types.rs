//! Stripe API object types (the subset this service reads).

use std::collections::HashMap;

use serde::Deserialize;

use storeline_core::PaymentStatus;

use super::StripeError;

/// A Stripe `PaymentIntent`.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    /// Intent status as a local [`PaymentStatus`].
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Parse` for a status this service does not know.
    pub fn payment_status(&self) -> Result<PaymentStatus, StripeError> {
        self.status
            .parse()
            .map_err(|e| StripeError::Parse(format!("payment intent {}: {e}", self.id)))
    }
}

/// A Stripe `Refund`.
#[derive(Debug, Clone, Deserialize)]
pub struct Refund {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
}

/// Parameters for creating a payment intent.
#[derive(Debug, Clone)]
pub struct CreatePaymentIntent {
    /// Amount in minor units.
    pub amount: i64,
    /// Lowercase ISO currency code.
    pub currency: String,
    /// Attached to the intent so webhooks can be traced back.
    pub metadata: Vec<(String, String)>,
}

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// Event types that change local payment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PaymentSucceeded,
    PaymentFailed,
    PaymentCanceled,
    PaymentProcessing,
    ChargeRefunded,
}

impl EventKind {
    /// Map a Stripe event type; `None` for types this service ignores.
    #[must_use]
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "payment_intent.succeeded" => Some(Self::PaymentSucceeded),
            "payment_intent.payment_failed" => Some(Self::PaymentFailed),
            "payment_intent.canceled" => Some(Self::PaymentCanceled),
            "payment_intent.processing" => Some(Self::PaymentProcessing),
            "charge.refunded" => Some(Self::ChargeRefunded),
            _ => None,
        }
    }

    /// Local status the payment moves to.
    ///
    /// A failed attempt returns the intent to `requires_payment_method`.
    #[must_use]
    pub const fn resulting_status(self) -> PaymentStatus {
        match self {
            Self::PaymentSucceeded => PaymentStatus::Succeeded,
            Self::PaymentFailed => PaymentStatus::RequiresPaymentMethod,
            Self::PaymentCanceled => PaymentStatus::Canceled,
            Self::PaymentProcessing => PaymentStatus::Processing,
            Self::ChargeRefunded => PaymentStatus::Refunded,
        }
    }
}

impl Event {
    /// Payment-intent id the event refers to.
    ///
    /// Intent events carry the intent as `data.object`; charge events
    /// reference it through `data.object.payment_intent`.
    #[must_use]
    pub fn payment_intent_id(&self) -> Option<&str> {
        let object = &self.data.object;
        match object.get("object").and_then(serde_json::Value::as_str) {
            Some("payment_intent") => object.get("id").and_then(serde_json::Value::as_str),
            _ => object
                .get("payment_intent")
                .and_then(serde_json::Value::as_str),
        }
    }
}

/// Error body returned by the Stripe API.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kinds() {
        assert_eq!(
            EventKind::from_event_type("payment_intent.succeeded"),
            Some(EventKind::PaymentSucceeded)
        );
        assert_eq!(
            EventKind::from_event_type("charge.refunded").map(EventKind::resulting_status),
            Some(PaymentStatus::Refunded)
        );
        assert_eq!(EventKind::from_event_type("customer.created"), None);
    }

    #[test]
    fn test_payment_intent_id_from_intent_and_charge() {
        let intent: Event = serde_json::from_value(serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {"object": {"object": "payment_intent", "id": "pi_123"}}
        }))
        .unwrap();
        assert_eq!(intent.payment_intent_id(), Some("pi_123"));

        let charge: Event = serde_json::from_value(serde_json::json!({
            "id": "evt_2",
            "type": "charge.refunded",
            "data": {"object": {"object": "charge", "id": "ch_1", "payment_intent": "pi_456"}}
        }))
        .unwrap();
        assert_eq!(charge.payment_intent_id(), Some("pi_456"));
    }

    #[test]
    fn test_payment_status_parse() {
        let intent: PaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_1", "amount": 2198, "currency": "usd", "status": "requires_action"
        }))
        .unwrap();
        assert_eq!(intent.payment_status().unwrap(), PaymentStatus::RequiresAction);
        assert!(intent.client_secret.is_none());
    }
}
