//! Access token and authentication error types

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{SessionData, keys};

/// Lifetime assumed when a grant response carries no expiry at all.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Returns `now` plus `secs`, or `None` when the result is out of range.
#[must_use]
pub fn expiry_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_seconds(secs).and_then(|delta| now.checked_add_signed(delta))
}

/// `OAuth2` access token with an absolute expiry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// The access token string
    pub access_token: String,
    /// Token type (usually "Bearer")
    pub token_type: String,
    /// When the token expires
    pub expires_at: DateTime<Utc>,
    /// Refresh token for obtaining new access tokens
    pub refresh_token: Option<String>,
}

impl AccessToken {
    /// Creates a token that expires `expires_in_secs` after `now`.
    ///
    /// Lifetimes past the representable range saturate at the latest
    /// (or earliest) representable instant.
    #[must_use]
    pub fn new(
        access_token: String,
        token_type: String,
        now: DateTime<Utc>,
        expires_in_secs: i64,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            access_token,
            token_type,
            expires_at: expiry_after(now, expires_in_secs).unwrap_or(if expires_in_secs < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            }),
            refresh_token,
        }
    }

    /// Restores a token from persisted session data.
    ///
    /// Returns `None` when the session holds no access token. A missing
    /// `tokenType` defaults to `Bearer`; a missing or unreadable `expires`
    /// yields a token that is already expired.
    #[must_use]
    pub fn from_session(data: &SessionData) -> Option<Self> {
        let access_token = data.get_str(keys::ACCESS_TOKEN)?.to_string();
        let token_type = data
            .get_str(keys::TOKEN_TYPE)
            .unwrap_or("Bearer")
            .to_string();
        let expires_at = data
            .get_int(keys::EXPIRES)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or(DateTime::UNIX_EPOCH);
        let refresh_token = data.get_str(keys::REFRESH_TOKEN).map(String::from);

        Some(Self {
            access_token,
            token_type,
            expires_at,
            refresh_token,
        })
    }

    /// Writes every token field into session data.
    ///
    /// The refresh token is only written when present so that a token without
    /// one never erases a stored refresh token.
    pub fn write_to(&self, data: &mut SessionData) {
        data.set(keys::ACCESS_TOKEN, self.access_token.as_str());
        data.set(keys::TOKEN_TYPE, self.token_type.as_str());
        data.set(keys::EXPIRES, self.expires_at.timestamp());
        if let Some(refresh_token) = &self.refresh_token {
            data.set(keys::REFRESH_TOKEN, refresh_token.as_str());
        }
    }

    /// Check if the token is expired or will expire within `leeway_secs`.
    #[must_use]
    pub fn is_expired_or_expiring(&self, now: DateTime<Utc>, leeway_secs: i64) -> bool {
        expiry_after(now, leeway_secs).map_or(leeway_secs > 0, |at| at >= self.expires_at)
    }

    /// Check if the token can be refreshed.
    #[must_use]
    pub const fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Seconds until expiry (negative once expired).
    #[must_use]
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds()
    }

    /// Returns the Authorization header value.
    ///
    /// Servers commonly answer `token_type: "bearer"`; the scheme is sent in
    /// its canonical `Bearer` spelling.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        let scheme = if self.token_type.is_empty() || self.token_type.eq_ignore_ascii_case("bearer")
        {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{scheme} {}", self.access_token)
    }

    /// Get a preview of the access token (first 8 chars + ...), safe to log.
    #[must_use]
    pub fn preview(&self) -> String {
        token_preview(&self.access_token)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &self.preview())
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Get a preview of a secret token (first 8 chars + ...).
#[must_use]
pub fn token_preview(token: &str) -> String {
    if token.len() > 12 && token.is_char_boundary(8) {
        format!("{}...", &token[..8])
    } else {
        "[REDACTED]".to_string()
    }
}

/// The `OAuth2` grant used for a token exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantKind {
    /// Resource owner password credentials grant.
    Password,
    /// Refresh token grant.
    RefreshToken,
}

impl GrantKind {
    /// The `grant_type` form value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl std::fmt::Display for GrantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of the current token for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    /// No token exists.
    NotAuthenticated,
    /// Token is valid and not expiring soon.
    Valid {
        /// Seconds until expiry.
        seconds_remaining: i64,
    },
    /// Token is valid but will expire within the refresh leeway.
    Expiring {
        /// Seconds until expiry.
        seconds_remaining: i64,
        /// Whether the token can be refreshed.
        can_refresh: bool,
    },
    /// Token has expired.
    Expired {
        /// Whether the token can be refreshed.
        can_refresh: bool,
    },
}

impl TokenStatus {
    /// Computes the status of an optional token at `now`.
    #[must_use]
    pub fn of(token: Option<&AccessToken>, now: DateTime<Utc>, leeway_secs: i64) -> Self {
        let Some(token) = token else {
            return Self::NotAuthenticated;
        };
        if token.is_expired_or_expiring(now, 0) {
            Self::Expired {
                can_refresh: token.can_refresh(),
            }
        } else if token.is_expired_or_expiring(now, leeway_secs) {
            Self::Expiring {
                seconds_remaining: token.seconds_until_expiry(now),
                can_refresh: token.can_refresh(),
            }
        } else {
            Self::Valid {
                seconds_remaining: token.seconds_until_expiry(now),
            }
        }
    }

    /// Returns true if the token is valid (not expired).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. } | Self::Expiring { .. })
    }

    /// Get a user-friendly display message.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::NotAuthenticated => "Not authenticated".to_string(),
            Self::Valid { seconds_remaining } => {
                let secs = *seconds_remaining;
                if secs > 3600 {
                    format!("Valid for {} hours", secs / 3600)
                } else if secs > 60 {
                    format!("Valid for {} minutes", secs / 60)
                } else {
                    format!("Valid for {secs} seconds")
                }
            }
            Self::Expiring {
                seconds_remaining,
                can_refresh,
            } => {
                let refresh_hint = if *can_refresh {
                    " (will auto-refresh)"
                } else {
                    ""
                };
                format!("Expiring in {seconds_remaining} seconds{refresh_hint}")
            }
            Self::Expired { can_refresh } => {
                if *can_refresh {
                    "Expired (can refresh)".to_string()
                } else {
                    "Expired".to_string()
                }
            }
        }
    }
}

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The password grant was rejected.
    #[error("authentication failed (HTTP {status}): {message}")]
    InvalidCredentials {
        /// HTTP status returned by the token endpoint.
        status: u16,
        /// Server error detail.
        message: String,
    },

    /// The refresh token was rejected (expired or revoked).
    #[error("token refresh rejected (HTTP {status}): {message}")]
    RefreshRejected {
        /// HTTP status returned by the token endpoint.
        status: u16,
        /// Server error detail.
        message: String,
    },

    /// The token endpoint answered with a body that is not a token.
    #[error("malformed {grant} grant response: {message}")]
    MalformedResponse {
        /// Grant that produced the response.
        grant: GrantKind,
        /// Parse error description.
        message: String,
    },

    /// No access token is available.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The access token expired and no refresh token is available.
    #[error("access token expired and no refresh token is available")]
    TokenExpired,
}
