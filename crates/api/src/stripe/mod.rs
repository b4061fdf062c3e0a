//! Stripe payment provider integration.
//!
//! - [`StripeClient`] creates, confirms and refunds payment intents
//! - [`webhook`] verifies `Stripe-Signature` headers and decodes events

mod client;
mod error;
pub mod types;
pub mod webhook;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use client::{PaymentProvider, StripeClient};
pub use error::StripeError;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakePaymentProvider;
pub use types::{CreatePaymentIntent, Event, EventKind, PaymentIntent, Refund};
