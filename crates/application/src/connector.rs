//! Connector: ties a session to the token provider and accounts client.

use std::sync::Arc;

use tollgate_domain::{AccessToken, ConnectorConfig, TokenStatus, keys};

use crate::accounts_client::AccountsClient;
use crate::auth::TokenProvider;
use crate::error::ConnectorResult;
use crate::interceptor::{BearerAuth, RequestLog};
use crate::ports::{Clock, SessionError, SessionStore, TransportFactory};
use crate::session::Session;

/// Authentication state of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No access token is known.
    Unauthenticated,
    /// An access token is known; it may already be expired.
    Authenticated,
    /// A refresh grant is in flight.
    Refreshing,
}

/// Entry point for talking to the accounts service as one user.
///
/// The connector loads its session on construction and writes the latest
/// token back on [`close`](Self::close). If it is dropped without being
/// closed, the same flush runs from `Drop` and failures are logged.
pub struct Connector {
    config: ConnectorConfig,
    session: Session,
    transports: Arc<dyn TransportFactory>,
    clock: Arc<dyn Clock>,
    tokens: Option<Arc<TokenProvider>>,
    client: Option<Arc<AccountsClient>>,
    closed: bool,
    logged_out: bool,
}

impl Connector {
    /// Creates a connector over a session in `store`.
    ///
    /// # Errors
    ///
    /// Returns a domain error if `config.session_id` is not a valid id.
    pub fn new(
        config: ConnectorConfig,
        store: Arc<dyn SessionStore>,
        transports: Arc<dyn TransportFactory>,
        clock: Arc<dyn Clock>,
    ) -> ConnectorResult<Self> {
        let session = Session::new(config.session_id()?, store);
        Self::with_session(config, session, transports, clock)
    }

    /// Creates a connector over an existing session.
    ///
    /// The session is bound to `config.session_id` and loaded unless it
    /// already was. A session that cannot be read starts out empty.
    ///
    /// # Errors
    ///
    /// Returns a domain error for an invalid session id, or
    /// [`SessionError::AlreadyLoaded`] if a loaded session has another id.
    pub fn with_session(
        config: ConnectorConfig,
        mut session: Session,
        transports: Arc<dyn TransportFactory>,
        clock: Arc<dyn Clock>,
    ) -> ConnectorResult<Self> {
        session.set_id(config.session_id()?)?;

        if !session.is_loaded()
            && let Err(e) = session.load()
        {
            tracing::warn!(
                session = %session.id(),
                error = %e,
                "could not read saved session, starting empty"
            );
        }

        tracing::debug!(
            session = %session.id(),
            endpoint = %config.accounts_endpoint,
            "connector ready"
        );

        Ok(Self {
            config,
            session,
            transports,
            clock,
            tokens: None,
            client: None,
            closed: false,
            logged_out: false,
        })
    }

    /// Logs in with a password grant.
    ///
    /// Without `force`, nothing happens when the session already belongs to
    /// `username`; the stored token is not checked. On success the username
    /// and token are written to the session (in memory; see
    /// [`save`](Self::save)). On failure the session is left as it was.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`](tollgate_domain::AuthError)
    /// if the server rejects the credentials, or the transport error.
    pub async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
        force: bool,
    ) -> ConnectorResult<()> {
        if !force && self.session.get_str(keys::USERNAME) == Some(username) {
            tracing::debug!(username, "already authenticated, skipping password grant");
            return Ok(());
        }

        let tokens = self.token_provider()?;
        let token = tokens.acquire_by_password(username, password).await?;

        self.session.set(keys::USERNAME, username);
        token.write_to(self.session.data_mut());
        if token.refresh_token.is_none() {
            self.session.remove(keys::REFRESH_TOKEN);
        }
        self.logged_out = false;
        Ok(())
    }

    /// The accounts API client, created on first use.
    ///
    /// Later calls return the same client. Requests carry the bearer token
    /// and are logged when debug was on at creation time.
    ///
    /// # Errors
    ///
    /// Returns an error if a transport cannot be built or the API URL is
    /// invalid.
    pub fn accounts_client(&mut self) -> ConnectorResult<Arc<AccountsClient>> {
        if let Some(client) = &self.client {
            return Ok(Arc::clone(client));
        }

        let tokens = self.token_provider()?;
        let transport = self.transports.build(&self.config.transport_options())?;

        let mut client = AccountsClient::new(self.config.api_url()?, transport);
        if self.config.debug {
            client = client.with_interceptor(Arc::new(RequestLog));
        }
        let client = Arc::new(client.with_interceptor(Arc::new(BearerAuth::new(tokens))));

        self.client = Some(Arc::clone(&client));
        Ok(client)
    }

    /// The token provider, created on first use and seeded from the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be built or the token URL is
    /// invalid.
    pub fn token_provider(&mut self) -> ConnectorResult<Arc<TokenProvider>> {
        if let Some(tokens) = &self.tokens {
            return Ok(Arc::clone(tokens));
        }

        let transport = self.transports.build(&self.config.transport_options())?;
        let tokens = Arc::new(
            TokenProvider::new(
                transport,
                self.config.token_url()?,
                self.config.client_id.as_str(),
                Arc::clone(&self.clock),
            )
            .with_leeway(self.config.refresh_leeway_secs)
            .with_token(AccessToken::from_session(self.session.data())),
        );

        self.tokens = Some(Arc::clone(&tokens));
        Ok(tokens)
    }

    /// The session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable access to the session.
    pub const fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Turns request logging on or off.
    ///
    /// Only clients created after this call are affected; an accounts
    /// client that already exists keeps its setting.
    pub const fn set_debug(&mut self, debug: bool) {
        self.config.debug = debug;
    }

    /// Turns TLS certificate verification on or off.
    ///
    /// Like [`set_debug`](Self::set_debug), this only affects clients
    /// created afterwards.
    pub const fn set_verify_tls(&mut self, verify: bool) {
        self.config.verify_tls = verify;
    }

    /// The current authentication state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        if self.tokens.as_ref().is_some_and(|t| t.is_refreshing()) {
            return ConnectionState::Refreshing;
        }
        if self.current_token().is_some() {
            ConnectionState::Authenticated
        } else {
            ConnectionState::Unauthenticated
        }
    }

    /// Expiry status of the current token.
    #[must_use]
    pub fn token_status(&self) -> TokenStatus {
        TokenStatus::of(
            self.current_token().as_ref(),
            self.clock.now(),
            self.config.refresh_leeway_secs,
        )
    }

    /// Writes the latest token into the session and saves it.
    ///
    /// # Errors
    ///
    /// Returns the store error if the session cannot be written.
    pub fn save(&mut self) -> Result<(), SessionError> {
        if let Some(token) = self.tokens.as_ref().and_then(|t| t.current_token()) {
            token.write_to(self.session.data_mut());
        }
        self.session.save()
    }

    /// Saves the session and consumes the connector.
    ///
    /// # Errors
    ///
    /// Returns the store error if the session cannot be written.
    pub fn close(mut self) -> Result<(), SessionError> {
        let result = self.save();
        self.closed = true;
        result
    }

    /// Forgets the user: clears the session and the in-memory token and
    /// deletes the saved session.
    ///
    /// The connector stays usable. Dropping it does not write the session
    /// back until [`authenticate`](Self::authenticate) succeeds again; an
    /// explicit [`save`](Self::save) still writes it.
    ///
    /// # Errors
    ///
    /// Returns the store error if the saved session cannot be deleted.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        if let Some(tokens) = &self.tokens {
            tokens.clear_token();
        }
        tracing::info!(session = %self.session.id(), "logged out");
        self.session.destroy()?;
        self.logged_out = true;
        Ok(())
    }

    fn current_token(&self) -> Option<AccessToken> {
        match &self.tokens {
            Some(tokens) => tokens.current_token(),
            None => AccessToken::from_session(self.session.data()),
        }
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        if self.closed || self.logged_out {
            return;
        }
        if let Err(e) = self.save() {
            tracing::warn!(
                session = %self.session.id(),
                error = %e,
                "failed to save session on drop"
            );
        }
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("session", &self.session)
            .field("endpoint", &self.config.accounts_endpoint.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
