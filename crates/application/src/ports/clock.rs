//! Clock port for expiry checks

use chrono::{DateTime, Utc};

/// Port for getting the current time.
///
/// Token expiry is decided against this clock, so tests can move time
/// forward without sleeping.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}
