//! Clock Port (Driven Port)

use crate::domain::shared::Timestamp;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Timestamp;
}
