//! Timestamp value object for temporal data.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A UTC timestamp for commitment expiry, deadlines and domain events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a new Timestamp from a DateTime<Utc>.
    #[must_use]
    pub const fn new(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get the current timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Build from Unix milliseconds, if in range.
    #[must_use]
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    /// Parse from an ISO 8601 string.
    ///
    /// # Errors
    ///
    /// Returns error if the string is not a valid ISO 8601 timestamp.
    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        let dt = DateTime::parse_from_rfc3339(s)?;
        Ok(Self(dt.with_timezone(&Utc)))
    }

    /// Get the inner DateTime<Utc>.
    #[must_use]
    pub const fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Get the Unix timestamp in milliseconds.
    #[must_use]
    pub fn unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// This timestamp shifted by a duration.
    #[must_use]
    pub fn plus(&self, duration: Duration) -> Self {
        Self(self.0 + duration)
    }

    /// This timestamp shifted forward by whole days.
    #[must_use]
    pub fn plus_days(&self, days: u16) -> Self {
        self.plus(Duration::days(i64::from(days)))
    }

    /// Calculate duration since another timestamp.
    #[must_use]
    pub fn duration_since(&self, other: Self) -> Duration {
        self.0 - other.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_days_and_duration_since() {
        let t0 = Timestamp::parse("2026-01-01T00:00:00Z").unwrap();
        let t7 = t0.plus_days(7);
        assert_eq!(t7.to_string(), "2026-01-08T00:00:00+00:00");
        assert_eq!(t7.duration_since(t0), Duration::days(7));
    }

    #[test]
    fn unix_millis_roundtrip() {
        let t = Timestamp::parse("2026-03-04T05:06:07.891Z").unwrap();
        let back = Timestamp::from_unix_millis(t.unix_millis()).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn ordering() {
        let a = Timestamp::parse("2026-01-01T00:00:00Z").unwrap();
        let b = a.plus(Duration::seconds(1));
        assert!(a < b);
    }
}
