//! Connector error types

use thiserror::Error;
use tollgate_domain::{AuthError, DomainError};

use crate::ports::{SessionError, TransportError};

/// Errors returned by the connector, the token provider and the accounts
/// client.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Authentication failed or no usable token exists.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The HTTP transport failed before a response arrived.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Session persistence failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// The API answered with a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or error detail.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ConnectorError {
    /// Returns the authentication error, if this is one.
    #[must_use]
    pub const fn as_auth(&self) -> Option<&AuthError> {
        match self {
            Self::Auth(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
