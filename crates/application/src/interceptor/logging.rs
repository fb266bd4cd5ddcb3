//! Debug request logging.

use std::time::Instant;

use async_trait::async_trait;
use tollgate_domain::{ApiRequest, ApiResponse};

use super::{Interceptor, Next};
use crate::error::ConnectorResult;

/// Logs each request and its outcome at `debug` level.
///
/// Header values are never logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLog;

#[async_trait]
impl Interceptor for RequestLog {
    async fn intercept(
        &self,
        request: ApiRequest,
        next: Next<'_>,
    ) -> ConnectorResult<ApiResponse> {
        let method = request.method;
        let url = request.url.clone();
        tracing::debug!(%method, %url, "sending request");

        let started = Instant::now();
        let result = next.run(request).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(response) => {
                tracing::debug!(%method, %url, status = response.status, elapsed_ms, "request completed");
            }
            Err(e) => {
                tracing::debug!(%method, %url, error = %e, elapsed_ms, "request failed");
            }
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ports::TransportError;
    use crate::test_support::StubTransport;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_passes_response_through() {
        let transport = StubTransport::new(|_| Ok(ApiResponse::new(201, "created")));
        let chain: Vec<Arc<dyn Interceptor>> = vec![Arc::new(RequestLog)];

        let response = Next::new(&transport, &chain)
            .run(ApiRequest::post("https://api.example.com/things".parse().unwrap()))
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.text(), "created");
    }

    #[tokio::test]
    async fn test_passes_error_through() {
        let transport =
            StubTransport::new(|_| Err(TransportError::Timeout { timeout_ms: 1_000 }));
        let chain: Vec<Arc<dyn Interceptor>> = vec![Arc::new(RequestLog)];

        let err = Next::new(&transport, &chain)
            .run(ApiRequest::get("https://api.example.com/".parse().unwrap()))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timed out"));
    }
}
