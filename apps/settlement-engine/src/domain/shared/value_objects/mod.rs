//! Value objects shared across bounded contexts.

mod amount;
mod basis_points;
mod identifiers;
mod price;
mod timestamp;

pub use amount::Amount;
pub use basis_points::BasisPoints;
pub use identifiers::{AssetId, CommitmentHash, Identity, OptionId};
pub use price::Price;
pub use timestamp::Timestamp;
