//! Bearer token attachment with refresh-and-retry.

use std::sync::Arc;

use async_trait::async_trait;
use tollgate_domain::{AccessToken, ApiRequest, ApiResponse};

use super::{Interceptor, Next};
use crate::auth::TokenProvider;
use crate::error::ConnectorResult;

/// Attaches the current access token to every request.
///
/// A token that is expired or about to expire is refreshed before the
/// request goes out. If the server still answers 401, the token is
/// refreshed and the request retried exactly once; a second 401 is
/// returned as is.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    tokens: Arc<TokenProvider>,
}

impl BearerAuth {
    /// Creates the interceptor over a shared provider.
    #[must_use]
    pub const fn new(tokens: Arc<TokenProvider>) -> Self {
        Self { tokens }
    }

    fn authorize(request: &ApiRequest, token: &AccessToken) -> ApiRequest {
        request
            .clone()
            .with_header("authorization", token.authorization_header())
    }
}

#[async_trait]
impl Interceptor for BearerAuth {
    async fn intercept(
        &self,
        request: ApiRequest,
        next: Next<'_>,
    ) -> ConnectorResult<ApiResponse> {
        let token = self.tokens.valid_token().await?;
        let response = next.run(Self::authorize(&request, &token)).await?;

        if !response.is_unauthorized() {
            return Ok(response);
        }

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            "request unauthorized, retrying with a refreshed token"
        );
        let refreshed = self.tokens.refresh_rejected(&token).await?;
        next.run(Self::authorize(&request, &refreshed)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::test_support::{ManualClock, StubTransport, token_json};
    use chrono::DateTime;
    use pretty_assertions::assert_eq;
    use tollgate_domain::AuthError;

    const NOW: i64 = 1_700_000_000;

    /// API answers 401 unless the bearer matches `valid`; the token
    /// endpoint hands out `tok-2`.
    fn server(valid: &'static str, token_status: u16) -> Arc<StubTransport> {
        Arc::new(StubTransport::new(move |request| {
            if request.url.path().ends_with("/oauth2/token") {
                if token_status == 200 {
                    return Ok(token_json("tok-2", Some("ref-2"), 3600));
                }
                return Ok(ApiResponse::new(token_status, r#"{"error":"invalid_grant"}"#));
            }
            if request.header("authorization") == Some(format!("Bearer {valid}").as_str()) {
                Ok(ApiResponse::new(200, "{}"))
            } else {
                Ok(ApiResponse::new(401, ""))
            }
        }))
    }

    fn provider(transport: Arc<StubTransport>, access: &str) -> Arc<TokenProvider> {
        let token = AccessToken::new(
            access.to_string(),
            "bearer".to_string(),
            DateTime::from_timestamp(NOW, 0).unwrap(),
            3600,
            Some("ref-1".to_string()),
        );
        Arc::new(
            TokenProvider::new(
                transport,
                "https://accounts.example.com/oauth2/token".parse().unwrap(),
                "platform-cli",
                Arc::new(ManualClock::at(NOW)),
            )
            .with_token(Some(token)),
        )
    }

    fn api_request() -> ApiRequest {
        ApiRequest::get("https://accounts.example.com/api/platform/me".parse().unwrap())
    }

    async fn send(
        transport: &StubTransport,
        tokens: Arc<TokenProvider>,
    ) -> ConnectorResult<ApiResponse> {
        let chain: Vec<Arc<dyn Interceptor>> = vec![Arc::new(BearerAuth::new(tokens))];
        Next::new(transport, &chain).run(api_request()).await
    }

    #[tokio::test]
    async fn test_attaches_bearer_header() {
        let transport = server("tok-1", 200);
        let tokens = provider(transport.clone(), "tok-1");

        let response = send(&transport, tokens).await.unwrap();

        assert_eq!(response.status, 200);
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].header("authorization"), Some("Bearer tok-1"));
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_and_retries_once() {
        let transport = server("tok-2", 200);
        let tokens = provider(transport.clone(), "tok-1");

        let response = send(&transport, tokens.clone()).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.requests_to("/oauth2/token").len(), 1);
        let api_calls = transport.requests_to("/me");
        assert_eq!(api_calls.len(), 2);
        assert_eq!(api_calls[1].header("authorization"), Some("Bearer tok-2"));
        assert_eq!(tokens.current_token().unwrap().access_token, "tok-2");
    }

    #[tokio::test]
    async fn test_second_unauthorized_is_returned() {
        let transport = server("never", 200);
        let tokens = provider(transport.clone(), "tok-1");

        let response = send(&transport, tokens).await.unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(transport.requests_to("/me").len(), 2);
        assert_eq!(transport.requests_to("/oauth2/token").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_fails_request() {
        let transport = server("tok-2", 400);
        let tokens = provider(transport.clone(), "tok-1");

        let err = send(&transport, tokens.clone()).await.unwrap_err();

        assert!(matches!(
            err.as_auth(),
            Some(AuthError::RefreshRejected { status: 400, .. })
        ));
        assert_eq!(transport.requests_to("/me").len(), 1);
        assert_eq!(tokens.current_token().unwrap().access_token, "tok-1");
    }
}
