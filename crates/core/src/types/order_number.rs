//! Human-readable order numbers.

use core::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// A human-readable order number, e.g. `VC20260806123456`.
///
/// Format: the `VC` prefix, the date as `YYYYMMDD`, then the last six digits
/// of the millisecond timestamp as a uniqueness suffix. Order numbers are
/// generated client-side at checkout; the backend's row id stays the
/// canonical key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generate an order number for the given instant.
    #[must_use]
    pub fn generate_at(now: DateTime<Utc>) -> Self {
        let suffix = now.timestamp_millis().rem_euclid(1_000_000);
        Self(format!(
            "VC{:04}{:02}{:02}{suffix:06}",
            now.year(),
            now.month(),
            now.day()
        ))
    }

    /// Generate an order number for the current instant.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `OrderNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
