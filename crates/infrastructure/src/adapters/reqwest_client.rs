//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpTransport` and `TransportFactory` ports
//! using the reqwest library. Every request the connector makes, token
//! grants included, goes through it. Request logging lives in the
//! interceptor chain; with debug on, only reqwest's connection-level
//! tracing is enabled here.

use std::error::Error as _;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tollgate_application::ports::{HttpTransport, TransportError, TransportFactory};
use tollgate_domain::{ApiRequest, ApiResponse, Headers, HttpMethod, TransportOptions};

/// HTTP transport backed by a configured `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout_ms: u64,
}

impl ReqwestTransport {
    /// Creates a transport honouring `options`.
    ///
    /// Configuration applied:
    /// - User-Agent from the options
    /// - Per-request timeout
    /// - Follow redirects: up to 10
    /// - TLS verification unless disabled
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new(options: &TransportOptions) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(options.user_agent.as_str())
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .danger_accept_invalid_certs(!options.verify_tls)
            .connection_verbose(options.debug)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        if !options.verify_tls {
            tracing::warn!("TLS certificate verification is disabled");
        }

        Ok(Self {
            client,
            timeout_ms: u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// Converts domain `HttpMethod` to reqwest `Method`.
    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    /// Maps reqwest errors to `TransportError`.
    fn map_error(&self, error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout {
                timeout_ms: self.timeout_ms,
            };
        }

        let message = error_chain(error);
        let lower = message.to_lowercase();
        if lower.contains("certificate") || lower.contains("tls") {
            return TransportError::Tls(message);
        }
        if error.is_connect() {
            return TransportError::ConnectionFailed(message);
        }
        if error.is_builder() {
            return TransportError::InvalidRequest(message);
        }

        TransportError::Other(message)
    }
}

/// Joins an error and its sources, since reqwest keeps the useful part
/// (refused, DNS, certificate) in the source chain.
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let start = Instant::now();

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.map_error(&e))?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_ascii_lowercase(),
                    v.to_str().unwrap_or("<binary>").to_string(),
                )
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_error(&e))?
            .to_vec();

        Ok(ApiResponse {
            status,
            headers,
            body,
            duration: start.elapsed(),
        })
    }
}

/// Builds a fresh [`ReqwestTransport`] for each set of options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestTransportFactory;

impl ReqwestTransportFactory {
    /// Creates a new factory.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TransportFactory for ReqwestTransportFactory {
    fn build(&self, options: &TransportOptions) -> Result<Arc<dyn HttpTransport>, TransportError> {
        Ok(Arc::new(ReqwestTransport::new(options)?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_to_reqwest_method() {
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Get),
            Method::GET
        );
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Post),
            Method::POST
        );
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Patch),
            Method::PATCH
        );
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Delete),
            Method::DELETE
        );
    }

    #[test]
    fn test_transport_creation() {
        let transport = ReqwestTransport::new(&TransportOptions::default());
        assert!(transport.is_ok());
    }

    #[test]
    fn test_factory_builds_insecure_transport() {
        let options = TransportOptions {
            verify_tls: false,
            debug: true,
            timeout: Duration::from_secs(5),
            ..TransportOptions::default()
        };
        assert!(ReqwestTransportFactory::new().build(&options).is_ok());
    }

    #[tokio::test]
    async fn test_round_trip_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/echo")
            .match_header("user-agent", "tollgate-test/1.0")
            .match_header("content-type", "application/json")
            .match_body(r#"{"a":1}"#)
            .with_status(201)
            .with_header("X-Trace", "abc")
            .with_body("created")
            .expect(1)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(&TransportOptions {
            user_agent: "tollgate-test/1.0".to_string(),
            ..TransportOptions::default()
        })
        .unwrap();
        let request = ApiRequest::post(format!("{}/echo", server.url()).parse().unwrap())
            .with_json(&serde_json::json!({"a": 1}))
            .unwrap();

        let response = transport.send(request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 201);
        assert_eq!(response.header("x-trace"), Some("abc"));
        assert_eq!(response.text(), "created");
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Connections complete in the backlog but nothing ever answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let transport = ReqwestTransport::new(&TransportOptions {
            timeout: Duration::from_millis(200),
            ..TransportOptions::default()
        })
        .unwrap();
        let request = ApiRequest::get(format!("http://{addr}/slow").parse().unwrap());

        let err = transport.send(request).await.unwrap_err();

        assert_eq!(err, TransportError::Timeout { timeout_ms: 200 });
        drop(listener);
    }

    #[tokio::test]
    async fn test_connection_failure_is_mapped() {
        let transport = ReqwestTransport::new(&TransportOptions::default()).unwrap();
        let request = ApiRequest::get("http://127.0.0.1:9/".parse().unwrap());

        let err = transport.send(request).await.unwrap_err();

        assert!(matches!(err, TransportError::ConnectionFailed(_)));
    }
}
