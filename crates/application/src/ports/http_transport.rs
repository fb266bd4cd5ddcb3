//! HTTP transport port

use std::sync::Arc;

use async_trait::async_trait;
use tollgate_domain::{ApiRequest, ApiResponse, TransportOptions};

/// Errors surfaced by a transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request timed out.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout {
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS setup or certificate verification failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Other(String),
}

/// Port for sending one HTTP request.
///
/// Implementations carry their own User-Agent, TLS and timeout settings;
/// see [`TransportFactory`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and returns the full response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns an error only when no response was received.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Port for building configured transports.
///
/// The connector builds one transport for token grants and one for the
/// accounts client, each from the options current at that moment.
pub trait TransportFactory: Send + Sync {
    /// Builds a transport honouring `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be created.
    fn build(&self, options: &TransportOptions) -> Result<Arc<dyn HttpTransport>, TransportError>;
}
