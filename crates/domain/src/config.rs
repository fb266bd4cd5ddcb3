//! Connector configuration
//!
//! Every field has a default, so a config file or environment only needs to
//! name what it changes.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DomainError, DomainResult};
use crate::session::SessionId;

/// Default authorization/accounts endpoint.
pub const DEFAULT_ACCOUNTS_ENDPOINT: &str = "https://marketplace.commerceguys.com";

/// Client identifier sent with every grant.
pub const DEFAULT_CLIENT_ID: &str = "platform-cli";

/// Path of the accounts API, relative to the endpoint.
pub const DEFAULT_API_PATH: &str = "api/platform/";

/// Path of the token endpoint, relative to the endpoint.
pub const DEFAULT_TOKEN_PATH: &str = "oauth2/token";

const PROJECT_URL: &str = "https://github.com/tollgate-rs/tollgate";

/// User-Agent identifying this client.
#[must_use]
pub fn default_user_agent() -> String {
    format!(
        "Tollgate-Client/{} (+{PROJECT_URL})",
        env!("CARGO_PKG_VERSION")
    )
}

/// Configuration of a connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Session the connector loads and saves
    pub session_id: String,
    /// Base URL of the accounts service, also the authorization endpoint
    pub accounts_endpoint: Url,
    /// `OAuth2` client identifier
    pub client_id: String,
    /// Accounts API path, relative to the endpoint
    pub api_path: String,
    /// Token endpoint path, relative to the endpoint
    pub token_path: String,
    /// User-Agent sent on every request
    pub user_agent: String,
    /// Log requests and responses
    pub debug: bool,
    /// Verify TLS certificates
    pub verify_tls: bool,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Tokens this close to expiry are refreshed before use
    pub refresh_leeway_secs: i64,
    /// Directory for session files; `None` uses the per-user default
    pub session_dir: Option<PathBuf>,
}

impl Default for ConnectorConfig {
    // DEFAULT_ACCOUNTS_ENDPOINT is a constant absolute URL; test_defaults parses it.
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self {
            session_id: SessionId::DEFAULT.to_string(),
            accounts_endpoint: Url::parse(DEFAULT_ACCOUNTS_ENDPOINT)
                .expect("default accounts endpoint is a valid URL"),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
            token_path: DEFAULT_TOKEN_PATH.to_string(),
            user_agent: default_user_agent(),
            debug: false,
            verify_tls: true,
            request_timeout_secs: 30,
            refresh_leeway_secs: 60,
            session_dir: None,
        }
    }
}

impl ConnectorConfig {
    /// Creates a config for a session and endpoint, other fields defaulted.
    #[must_use]
    pub fn new(session_id: impl Into<String>, accounts_endpoint: Url) -> Self {
        Self {
            session_id: session_id.into(),
            accounts_endpoint,
            ..Self::default()
        }
    }

    /// Override the session directory.
    #[must_use]
    pub fn with_session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = Some(dir.into());
        self
    }

    /// Enable or disable debug logging.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enable or disable TLS certificate verification.
    #[must_use]
    pub const fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Override the refresh leeway.
    #[must_use]
    pub const fn with_refresh_leeway(mut self, secs: i64) -> Self {
        self.refresh_leeway_secs = secs;
        self
    }

    /// The validated session id.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidIdentifier`] for an unusable id.
    pub fn session_id(&self) -> DomainResult<SessionId> {
        SessionId::new(self.session_id.as_str())
    }

    /// Base URL of the accounts API.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidUrl`] if the path cannot be joined.
    pub fn api_url(&self) -> DomainResult<Url> {
        self.resolve(&self.api_path)
    }

    /// URL of the token endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidUrl`] if the path cannot be joined.
    pub fn token_url(&self) -> DomainResult<Url> {
        self.resolve(&self.token_path)
    }

    /// Options for building HTTP transports.
    #[must_use]
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            user_agent: self.user_agent.clone(),
            verify_tls: self.verify_tls,
            debug: self.debug,
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    // An endpoint with a path but no trailing slash would lose its last
    // segment on join, so the slash is added first.
    fn resolve(&self, path: &str) -> DomainResult<Url> {
        let mut base = self.accounts_endpoint.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| DomainError::InvalidUrl(format!("{e}: {base}{path}")))
    }
}

/// Settings applied when a transport is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// User-Agent header value
    pub user_agent: String,
    /// Verify TLS certificates
    pub verify_tls: bool,
    /// Log requests and responses
    pub debug: bool,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        ConnectorConfig::default().transport_options()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ConnectorConfig::default();
        assert_eq!(config.session_id, "default");
        assert_eq!(config.client_id, "platform-cli");
        assert!(config.verify_tls);
        assert!(!config.debug);
        assert!(config.user_agent.starts_with("Tollgate-Client/"));
        assert_eq!(config.accounts_endpoint.as_str(), "https://marketplace.commerceguys.com/");
    }

    #[test]
    fn test_urls_resolve_against_endpoint() {
        let config = ConnectorConfig::new("s", "https://accounts.example.com".parse().unwrap());
        assert_eq!(
            config.api_url().unwrap().as_str(),
            "https://accounts.example.com/api/platform/"
        );
        assert_eq!(
            config.token_url().unwrap().as_str(),
            "https://accounts.example.com/oauth2/token"
        );
    }

    #[test]
    fn test_endpoint_path_is_kept() {
        let config = ConnectorConfig::new("s", "https://example.com/accounts".parse().unwrap());
        assert_eq!(
            config.token_url().unwrap().as_str(),
            "https://example.com/accounts/oauth2/token"
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ConnectorConfig =
            serde_json::from_str(r#"{"session_id": "work", "debug": true}"#).unwrap();
        assert_eq!(config.session_id, "work");
        assert!(config.debug);
        assert_eq!(config.accounts_endpoint.as_str(), "https://marketplace.commerceguys.com/");
    }

    #[test]
    fn test_transport_options_follow_flags() {
        let options = ConnectorConfig::default()
            .with_debug(true)
            .with_verify_tls(false)
            .transport_options();
        assert!(options.debug);
        assert!(!options.verify_tls);
        assert_eq!(options.timeout, Duration::from_secs(30));
    }
}
