//! Token endpoint wire types.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tollgate_domain::auth::{DEFAULT_TOKEN_LIFETIME_SECS, expiry_after};
use tollgate_domain::{AccessToken, ApiResponse, AuthError, GrantKind};

/// `OAuth2` token response from the token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Absolute expiry, sent by some servers instead of `expires_in`.
    #[serde(default)]
    expires: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    /// Converts the response into a token with an absolute expiry.
    ///
    /// `previous_refresh_token` is kept when the server does not rotate it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedResponse`] when `expires_in` does not
    /// fit in a timestamp.
    pub(crate) fn into_token(
        self,
        grant: GrantKind,
        now: DateTime<Utc>,
        previous_refresh_token: Option<&str>,
    ) -> Result<AccessToken, AuthError> {
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh_token.map(String::from));

        let expires_at = match (self.expires_in, self.expires) {
            (Some(expires_in), _) => {
                expiry_after(now, expires_in).ok_or_else(|| AuthError::MalformedResponse {
                    grant,
                    message: format!("expires_in {expires_in} is out of range"),
                })?
            }
            (None, Some(expires)) => {
                DateTime::from_timestamp(expires, 0).ok_or_else(|| AuthError::MalformedResponse {
                    grant,
                    message: format!("expires {expires} is out of range"),
                })?
            }
            (None, None) => {
                tracing::debug!(
                    lifetime_secs = DEFAULT_TOKEN_LIFETIME_SECS,
                    "token response carries no expiry, assuming default lifetime"
                );
                expiry_after(now, DEFAULT_TOKEN_LIFETIME_SECS).ok_or_else(|| {
                    AuthError::MalformedResponse {
                        grant,
                        message: "token lifetime is out of range".to_string(),
                    }
                })?
            }
        };

        Ok(AccessToken {
            access_token: self.access_token,
            token_type: self.token_type,
            expires_at,
            refresh_token,
        })
    }
}

/// `OAuth2` error response.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Maps a non-success token endpoint response to an [`AuthError`].
pub(crate) fn grant_error(grant: GrantKind, response: &ApiResponse) -> AuthError {
    let message = match response.json::<TokenErrorResponse>() {
        Ok(body) => match body.error_description {
            Some(description) => format!("{}: {description}", body.error),
            None => body.error,
        },
        Err(_) => {
            let text = response.text();
            if text.trim().is_empty() {
                "no error detail".to_string()
            } else {
                text
            }
        }
    };

    match grant {
        GrantKind::Password => AuthError::InvalidCredentials {
            status: response.status,
            message,
        },
        GrantKind::RefreshToken => AuthError::RefreshRejected {
            status: response.status,
            message,
        },
    }
}
