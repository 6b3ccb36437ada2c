//! Pricing Bounded Context
//!
//! Duration-proportional premiums and display yield metrics.

mod premium;

pub use premium::{PremiumCalculator, YieldMetrics};
