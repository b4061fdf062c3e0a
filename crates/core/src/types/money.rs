//! Type-safe money representation using decimal arithmetic.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur during money arithmetic.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Two amounts in different currencies were combined.
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        /// Currency of the left operand.
        left: CurrencyCode,
        /// Currency of the right operand.
        right: CurrencyCode,
    },
    /// The amount does not fit the provider's integer minor-unit field.
    #[error("amount out of range")]
    OutOfRange,
}

/// Reasons a catalog unit price is rejected.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceError {
    #[error("must be greater than 0")]
    NotPositive,
    #[error("must have at most 2 decimal places")]
    TooPrecise,
    #[error("must be at most 9999999999.99")]
    TooLarge,
}

/// Decimal places a stored unit price may carry (`NUMERIC(12, 2)`).
pub const PRICE_SCALE: u32 = 2;

/// Largest storable unit price, 9 999 999 999.99.
#[must_use]
pub fn max_unit_price() -> Decimal {
    Decimal::new(999_999_999_999, PRICE_SCALE)
}

/// Check that `price` is positive and fits the catalog's price column.
///
/// Trailing zeros do not count towards the scale (`10.990` is accepted).
///
/// # Errors
///
/// Returns the first [`PriceError`] the price violates.
pub fn check_unit_price(price: Decimal) -> Result<(), PriceError> {
    if price <= Decimal::ZERO {
        return Err(PriceError::NotPositive);
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(PriceError::TooPrecise);
    }
    if price > max_unit_price() {
        return Err(PriceError::TooLarge);
    }
    Ok(())
}

/// Error returned when a currency code is not supported.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported currency: {0}")]
pub struct CurrencyError(String);

/// ISO 4217 currency codes accepted by the store.
///
/// Serialized lowercase, matching the payment provider's wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCode {
    #[default]
    Usd,
    Eur,
    Gbp,
    Cad,
    Aud,
}

impl CurrencyCode {
    /// Lowercase code as sent to the payment provider.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Eur => "eur",
            Self::Gbp => "gbp",
            Self::Cad => "cad",
            Self::Aud => "aud",
        }
    }

    /// Number of decimal places in the minor unit (cents).
    #[must_use]
    pub const fn minor_unit_exponent(self) -> u32 {
        2
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::Usd),
            "eur" => Ok(Self::Eur),
            "gbp" => Ok(Self::Gbp),
            "cad" => Ok(Self::Cad),
            "aud" => Ok(Self::Aud),
            _ => Err(CurrencyError(s.to_owned())),
        }
    }
}

/// An amount with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Build an amount from integer minor units (e.g., cents).
    #[must_use]
    pub fn from_minor_units(units: i64, currency: CurrencyCode) -> Self {
        Self::new(Decimal::new(units, currency.minor_unit_exponent()), currency)
    }

    /// Multiply a unit price by a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::OutOfRange`] if the product overflows a `Decimal`.
    pub fn times(self, quantity: u32) -> Result<Self, MoneyError> {
        self.amount
            .checked_mul(Decimal::from(quantity))
            .map(|amount| Self::new(amount, self.currency))
            .ok_or(MoneyError::OutOfRange)
    }

    /// Add two amounts of the same currency.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] when currencies differ and
    /// [`MoneyError::OutOfRange`] if the sum overflows.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        self.amount
            .checked_add(other.amount)
            .map(|amount| Self::new(amount, self.currency))
            .ok_or(MoneyError::OutOfRange)
    }

    /// Amount in integer minor units, rounded half-even.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::OutOfRange`] if the value does not fit an `i64`.
    pub fn to_minor_units(self) -> Result<i64, MoneyError> {
        let scale = Decimal::from(10_i64.pow(self.currency.minor_unit_exponent()));
        self.amount
            .checked_mul(scale)
            .and_then(|minor| minor.round().to_i64())
            .ok_or(MoneyError::OutOfRange)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn usd(s: &str) -> Money {
        Money::new(Decimal::from_str(s).unwrap(), CurrencyCode::Usd)
    }

    #[test]
    fn test_times_is_exact() {
        assert_eq!(usd("10.99").times(2).unwrap(), usd("21.98"));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let huge = Money::new(Decimal::MAX, CurrencyCode::Usd);
        assert_eq!(huge.times(2), Err(MoneyError::OutOfRange));
        assert_eq!(huge.checked_add(usd("1")), Err(MoneyError::OutOfRange));
        assert_eq!(huge.to_minor_units(), Err(MoneyError::OutOfRange));
    }

    #[test]
    fn test_unit_price_limits() {
        let price = |s: &str| Decimal::from_str(s).unwrap();
        assert_eq!(check_unit_price(price("10.99")), Ok(()));
        assert_eq!(check_unit_price(price("10.990")), Ok(()));
        assert_eq!(check_unit_price(price("9999999999.99")), Ok(()));
        assert_eq!(check_unit_price(price("0")), Err(PriceError::NotPositive));
        assert_eq!(check_unit_price(price("-1")), Err(PriceError::NotPositive));
        assert_eq!(check_unit_price(price("10.999")), Err(PriceError::TooPrecise));
        assert_eq!(check_unit_price(price("10000000000")), Err(PriceError::TooLarge));
        assert_eq!(check_unit_price(Decimal::MAX), Err(PriceError::TooLarge));
    }

    #[test]
    fn test_checked_add_mismatch() {
        let eur = Money::zero(CurrencyCode::Eur);
        assert!(matches!(
            usd("1.00").checked_add(eur),
            Err(MoneyError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(usd("21.98").to_minor_units().unwrap(), 2198);
        assert_eq!(Money::from_minor_units(2198, CurrencyCode::Usd), usd("21.98"));
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("USD".parse::<CurrencyCode>().unwrap(), CurrencyCode::Usd);
        assert!("xyz".parse::<CurrencyCode>().is_err());
        assert_eq!(serde_json::to_string(&CurrencyCode::Gbp).unwrap(), "\"gbp\"");
    }
}
