//! Price value object.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::{Amount, DomainError};

/// Price of one unit of an underlying, in quote currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Get the inner Decimal value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Create a price, rejecting zero and negative values.
    ///
    /// # Errors
    ///
    /// Returns error if `value` is not strictly positive.
    pub fn positive(value: Decimal) -> Result<Self, DomainError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(DomainError::InvalidValue {
                field: "price".to_string(),
                message: format!("must be positive, got {value}"),
            })
        }
    }

    /// Quote-currency value of `quantity` units, or `None` if it is not
    /// representable.
    #[must_use]
    pub fn checked_value_of(&self, quantity: Amount) -> Option<Amount> {
        quantity.checked_mul(self.0)
    }

    /// Relative distance from `reference`, in basis points (rounded up).
    ///
    /// Returns `None` if `reference` is zero or the distance overflows.
    #[must_use]
    pub fn deviation_bps(&self, reference: Self) -> Option<Decimal> {
        if reference.0.is_zero() {
            return None;
        }
        let bps = self
            .0
            .checked_sub(reference.0)?
            .abs()
            .checked_mul(Decimal::from(10_000))?
            .checked_div(reference.0)?;
        Some(bps.ceil())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl From<Decimal> for Price {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn positive_rejects_zero() {
        assert!(Price::positive(dec!(0)).is_err());
        assert!(Price::positive(dec!(-3)).is_err());
        assert_eq!(Price::positive(dec!(3500)).unwrap().value(), dec!(3500));
    }

    #[test]
    fn value_of_quantity() {
        let p = Price::new(dec!(4000));
        assert_eq!(p.checked_value_of(Amount::new(dec!(0.5))), Some(Amount::new(dec!(2000))));
        assert_eq!(Price::new(Decimal::MAX).checked_value_of(Amount::new(dec!(2))), None);
    }

    #[test]
    fn deviation_in_bps() {
        let oracle = Price::new(dec!(4000));
        assert_eq!(Price::new(dec!(4004)).deviation_bps(oracle), Some(dec!(10)));
        assert_eq!(Price::new(dec!(3996)).deviation_bps(oracle), Some(dec!(10)));
        assert_eq!(Price::new(dec!(4000.1)).deviation_bps(oracle), Some(dec!(1)));
        assert_eq!(oracle.deviation_bps(Price::new(dec!(0))), None);
        assert_eq!(Price::new(Decimal::MAX).deviation_bps(Price::new(dec!(0.5))), None);
    }
}
