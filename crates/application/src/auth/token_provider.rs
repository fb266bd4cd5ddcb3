//! `OAuth2` password and refresh-token grants.

use std::sync::Arc;

use parking_lot::Mutex;
use tollgate_domain::{AccessToken, ApiRequest, AuthError, DomainError, GrantKind};
use url::Url;

use super::grant::{TokenResponse, grant_error};
use crate::error::ConnectorResult;
use crate::ports::{Clock, HttpTransport};

/// Obtains and refreshes access tokens, and holds the current one.
///
/// The current token lives behind a short-lived lock that is never held
/// across an await point. Refreshes go through a separate async guard so
/// that concurrent callers holding the same stale token trigger a single
/// refresh grant.
pub struct TokenProvider {
    transport: Arc<dyn HttpTransport>,
    token_url: Url,
    client_id: String,
    clock: Arc<dyn Clock>,
    leeway_secs: i64,
    current: Mutex<Option<AccessToken>>,
    refresh_guard: tokio::sync::Mutex<()>,
}

impl TokenProvider {
    /// Creates a provider posting grants to `token_url`.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        token_url: Url,
        client_id: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            token_url,
            client_id: client_id.into(),
            clock,
            leeway_secs: 60,
            current: Mutex::new(None),
            refresh_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Seconds before expiry at which a token is refreshed proactively.
    #[must_use]
    pub const fn with_leeway(mut self, leeway_secs: i64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    /// Seeds the provider with a previously persisted token.
    #[must_use]
    pub fn with_token(self, token: Option<AccessToken>) -> Self {
        *self.current.lock() = token;
        self
    }

    /// The token endpoint.
    #[must_use]
    pub const fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// The current token, if any.
    #[must_use]
    pub fn current_token(&self) -> Option<AccessToken> {
        self.current.lock().clone()
    }

    /// Replaces the current token.
    pub fn set_current_token(&self, token: AccessToken) {
        *self.current.lock() = Some(token);
    }

    /// Forgets the current token.
    pub fn clear_token(&self) {
        *self.current.lock() = None;
    }

    /// Returns true while a refresh grant is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.refresh_guard.try_lock().is_err()
    }

    /// Exchanges a username and password for a token.
    ///
    /// On success the token becomes the current token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the server rejects the
    /// grant, [`AuthError::MalformedResponse`] if the answer is not a token,
    /// or the transport error if no answer arrived.
    pub async fn acquire_by_password(
        &self,
        username: &str,
        password: &str,
    ) -> ConnectorResult<AccessToken> {
        tracing::debug!(username, token_url = %self.token_url, "requesting password grant");

        let token = self
            .exchange(
                GrantKind::Password,
                &[("username", username), ("password", password)],
                None,
            )
            .await?;

        tracing::info!(username, token = %token.preview(), "authenticated");
        self.set_current_token(token.clone());
        Ok(token)
    }

    /// Exchanges a refresh token for a new token.
    ///
    /// When the server does not rotate the refresh token, `refresh_token`
    /// is kept on the new token. On success the token becomes the current
    /// token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RefreshRejected`] if the server rejects the
    /// grant, [`AuthError::MalformedResponse`] if the answer is not a token,
    /// or the transport error if no answer arrived.
    pub async fn refresh(&self, refresh_token: &str) -> ConnectorResult<AccessToken> {
        let token = self
            .exchange(
                GrantKind::RefreshToken,
                &[("refresh_token", refresh_token)],
                Some(refresh_token),
            )
            .await?;

        tracing::info!(token = %token.preview(), expires_at = %token.expires_at, "token refreshed");
        self.set_current_token(token.clone());
        Ok(token)
    }

    /// Returns a token fit for use, refreshing it first if it is expired or
    /// about to expire.
    ///
    /// A token inside the leeway window without a refresh token is still
    /// returned until it actually expires.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] without a token,
    /// [`AuthError::TokenExpired`] if it expired and cannot be refreshed,
    /// or the refresh failure.
    pub async fn valid_token(&self) -> ConnectorResult<AccessToken> {
        let token = self.current_token().ok_or(AuthError::NotAuthenticated)?;
        let now = self.clock.now();

        if !token.is_expired_or_expiring(now, self.leeway_secs) {
            return Ok(token);
        }
        if !token.can_refresh() {
            if token.is_expired_or_expiring(now, 0) {
                return Err(AuthError::TokenExpired.into());
            }
            return Ok(token);
        }

        self.refresh_stale(&token).await
    }

    /// Refreshes after the server rejected `rejected` with a 401.
    ///
    /// If another caller already replaced the rejected token, that token is
    /// returned without a new grant.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenExpired`] if no refresh token is available,
    /// or the refresh failure.
    pub async fn refresh_rejected(&self, rejected: &AccessToken) -> ConnectorResult<AccessToken> {
        tracing::debug!(token = %rejected.preview(), "access token rejected, refreshing");
        self.refresh_stale(rejected).await
    }

    async fn refresh_stale(&self, stale: &AccessToken) -> ConnectorResult<AccessToken> {
        let _guard = self.refresh_guard.lock().await;

        let current = self.current_token().ok_or(AuthError::NotAuthenticated)?;
        if current.access_token != stale.access_token
            && !current.is_expired_or_expiring(self.clock.now(), self.leeway_secs)
        {
            tracing::debug!(token = %current.preview(), "token already refreshed");
            return Ok(current);
        }

        let refresh_token = current.refresh_token.ok_or(AuthError::TokenExpired)?;
        self.refresh(&refresh_token).await
    }

    async fn exchange(
        &self,
        grant: GrantKind,
        params: &[(&str, &str)],
        previous_refresh_token: Option<&str>,
    ) -> ConnectorResult<AccessToken> {
        let mut form = vec![
            ("grant_type", grant.as_str()),
            ("client_id", self.client_id.as_str()),
        ];
        form.extend_from_slice(params);
        let body = serde_urlencoded::to_string(&form)
            .map_err(|e| DomainError::InvalidBody(e.to_string()))?;

        let request = ApiRequest::post(self.token_url.clone())
            .with_form(body)
            .with_header("accept", "application/json");

        let response = self.transport.send(request).await?;

        if !response.is_success() {
            let error = grant_error(grant, &response);
            tracing::warn!(grant = %grant, status = response.status, error = %error, "grant rejected");
            return Err(error.into());
        }

        let parsed: TokenResponse = response.json().map_err(|e| AuthError::MalformedResponse {
            grant,
            message: e.to_string(),
        })?;

        Ok(parsed.into_token(grant, self.clock.now(), previous_refresh_token)?)
    }
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("leeway_secs", &self.leeway_secs)
            .field("current", &*self.current.lock())
            .finish_non_exhaustive()
    }
}
