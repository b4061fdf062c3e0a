//! Core types for Storeline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{
    CurrencyCode, CurrencyError, Money, MoneyError, PRICE_SCALE, PriceError, check_unit_price,
    max_unit_price,
};
pub use status::*;
