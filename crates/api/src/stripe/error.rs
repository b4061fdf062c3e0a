//! Stripe error types.

use thiserror::Error;

/// Errors that can occur when talking to Stripe or verifying its webhooks.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Webhook request carried no `Stripe-Signature` header.
    #[error("missing webhook signature")]
    MissingSignature,

    /// Webhook signature header was malformed, stale or did not match.
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// Webhook payload was signed correctly but is not a readable event.
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),
}
