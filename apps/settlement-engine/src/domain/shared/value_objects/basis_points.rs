//! Basis point value object.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A ratio expressed in basis points (1 bps = 0.01%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasisPoints(u32);

impl BasisPoints {
    /// 100% expressed in basis points.
    pub const FULL: Self = Self(10_000);

    /// Zero basis points.
    pub const ZERO: Self = Self(0);

    /// Create a new basis point value.
    #[must_use]
    pub const fn new(bps: u32) -> Self {
        Self(bps)
    }

    /// Get the raw basis point count.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// The ratio as a decimal fraction (10 bps -> 0.001).
    #[must_use]
    pub fn as_fraction(&self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(10_000)
    }

    /// Apply this ratio to a value, or `None` if the result is not
    /// representable.
    ///
    /// Multiplies before dividing so small values do not truncate. Values
    /// too large for that are divided first.
    #[must_use]
    pub fn apply(&self, value: Decimal) -> Option<Decimal> {
        let bps = Decimal::from(self.0);
        let full = Decimal::from(10_000);
        match value.checked_mul(bps) {
            Some(scaled) => scaled.checked_div(full),
            None => value.checked_div(full)?.checked_mul(bps),
        }
    }

    /// `10000 - self`, floored at zero.
    #[must_use]
    pub const fn complement(&self) -> Self {
        Self(10_000u32.saturating_sub(self.0))
    }
}

impl fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bps", self.0)
    }
}
