//! Persisted session state.
//!
//! A session is the authentication state of one identity, stored under a
//! stable [`SessionId`]. Values are opaque strings or integers; the
//! well-known keys used by the connector live in [`keys`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Well-known session keys.
pub mod keys {
    /// Username the session was authenticated for.
    pub const USERNAME: &str = "username";
    /// Opaque access token.
    pub const ACCESS_TOKEN: &str = "accessToken";
    /// Token type, usually `Bearer`.
    pub const TOKEN_TYPE: &str = "tokenType";
    /// Absolute expiry in epoch seconds.
    pub const EXPIRES: &str = "expires";
    /// Opaque refresh token.
    pub const REFRESH_TOKEN: &str = "refreshToken";
}

/// Stable key under which a session is persisted.
///
/// Session ids end up in file names, so only ASCII alphanumerics, `-`, `_`
/// and `.` are accepted, and a leading `.` is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Default session id used when the caller does not pick one.
    pub const DEFAULT: &'static str = "default";

    /// Validates and wraps a session id.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidIdentifier`] if the id is empty, starts
    /// with `.`, or contains characters outside `[A-Za-z0-9._-]`.
    pub fn new(id: impl Into<String>) -> DomainResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidIdentifier(
                "session id cannot be empty".to_string(),
            ));
        }
        if id.starts_with('.') {
            return Err(DomainError::InvalidIdentifier(format!(
                "session id cannot start with '.': {id}"
            )));
        }
        if let Some(ch) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(DomainError::InvalidIdentifier(format!(
                "session id contains invalid character '{ch}': {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = DomainError;

    fn try_from(value: String) -> DomainResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for SessionId {
    type Error = DomainError;

    fn try_from(value: &str) -> DomainResult<Self> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// A single session value: either a string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionValue {
    /// Integer value, e.g. an epoch timestamp.
    Int(i64),
    /// String value.
    Str(String),
}

impl SessionValue {
    /// Returns the string value, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Int(_) => None,
        }
    }

    /// Returns the integer value.
    ///
    /// Numeric strings are accepted too, since older session files stored
    /// timestamps as strings.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for SessionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for SessionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for SessionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for SessionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// In-memory session key/value data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionData(BTreeMap<String, SessionValue>);

impl SessionData {
    /// Creates empty session data.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Gets a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SessionValue> {
        self.0.get(key)
    }

    /// Gets a string value by key.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(SessionValue::as_str)
    }

    /// Gets an integer value by key.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(SessionValue::as_int)
    }

    /// Sets a value, replacing any previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<SessionValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) -> Option<SessionValue> {
        self.0.remove(key)
    }

    /// Removes every value.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Returns true if no values are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of values set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over keys and values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SessionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_session_id_accepts_simple_names() {
        assert!(SessionId::new("default").is_ok());
        assert!(SessionId::new("user-1_prod.v2").is_ok());
    }

    #[test]
    fn test_session_id_rejects_path_like_names() {
        assert!(SessionId::new("").is_err());
        assert!(SessionId::new("../etc").is_err());
        assert!(SessionId::new("a/b").is_err());
        assert!(SessionId::new(".hidden").is_err());
        assert!(SessionId::new("with space").is_err());
    }

    #[test]
    fn test_session_value_untagged_json() {
        let mut data = SessionData::new();
        data.set(keys::USERNAME, "alice");
        data.set(keys::EXPIRES, 1_700_000_000_i64);

        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, r#"{"expires":1700000000,"username":"alice"}"#);

        let parsed: SessionData = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.get_str(keys::USERNAME), Some("alice"));
        assert_eq!(parsed.get_int(keys::EXPIRES), Some(1_700_000_000));
    }

    #[test]
    fn test_numeric_string_reads_as_int() {
        let value = SessionValue::from("42");
        assert_eq!(value.as_int(), Some(42));
        assert_eq!(value.as_str(), Some("42"));
        assert_eq!(SessionValue::from(7_i64).as_str(), None);
    }

    #[test]
    fn test_missing_key_is_absent() {
        let data = SessionData::new();
        assert!(data.get(keys::USERNAME).is_none());
        assert!(data.is_empty());
    }
}
