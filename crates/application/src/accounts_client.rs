//! Authenticated client for the accounts API.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tollgate_domain::{ApiRequest, ApiResponse, DomainError, HttpMethod};
use url::Url;

use crate::error::{ConnectorError, ConnectorResult};
use crate::interceptor::{Interceptor, Next};
use crate::ports::HttpTransport;

/// HTTP client rooted at the accounts API base URL.
///
/// Every request runs through the interceptor chain, in the order the
/// interceptors were added, before reaching the transport.
pub struct AccountsClient {
    base_url: Url,
    transport: Arc<dyn HttpTransport>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl AccountsClient {
    /// Creates a client without interceptors.
    pub fn new(base_url: Url, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url,
            transport,
            interceptors: Vec::new(),
        }
    }

    /// Appends an interceptor to the chain.
    #[must_use]
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// The API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `path` against the base URL.
    ///
    /// Leading slashes are ignored so paths always stay under the base.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidUrl`] if the result is not a valid URL.
    pub fn url(&self, path: &str) -> ConnectorResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| DomainError::InvalidUrl(format!("{path}: {e}")).into())
    }

    /// Builds a request for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidUrl`] if the path does not resolve.
    pub fn request(&self, method: HttpMethod, path: &str) -> ConnectorResult<ApiRequest> {
        Ok(ApiRequest::new(method, self.url(path)?))
    }

    /// Sends a request through the interceptor chain.
    ///
    /// Any status is returned as a response; only failures to get one
    /// are errors.
    ///
    /// # Errors
    ///
    /// Returns authentication errors from token handling or the transport
    /// error.
    pub async fn send(&self, request: ApiRequest) -> ConnectorResult<ApiResponse> {
        Next::new(self.transport.as_ref(), &self.interceptors)
            .run(request)
            .await
    }

    /// GETs `path` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Api`] on a non-success status and
    /// [`ConnectorError::Decode`] if the body is not the expected JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ConnectorResult<T> {
        let request = self
            .request(HttpMethod::Get, path)?
            .with_header("accept", "application/json");
        decode(self.send(request).await?)
    }

    /// POSTs `body` as JSON to `path` and decodes the JSON answer.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Api`] on a non-success status and
    /// [`ConnectorError::Decode`] if the answer is not the expected JSON.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ConnectorResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(HttpMethod::Post, path)?.with_json(body)?;
        decode(self.send(request).await?)
    }

    /// DELETEs `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Api`] on a non-success status.
    pub async fn delete(&self, path: &str) -> ConnectorResult<()> {
        let request = self.request(HttpMethod::Delete, path)?;
        let response = self.send(request).await?;
        ensure_success(&response)
    }
}

fn ensure_success(response: &ApiResponse) -> ConnectorResult<()> {
    if response.is_success() {
        return Ok(());
    }
    Err(ConnectorError::Api {
        status: response.status,
        message: response.text(),
    })
}

fn decode<T: DeserializeOwned>(response: ApiResponse) -> ConnectorResult<T> {
    ensure_success(&response)?;
    response
        .json()
        .map_err(|e| ConnectorError::Decode(e.to_string()))
}

impl std::fmt::Debug for AccountsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountsClient")
            .field("base_url", &self.base_url.as_str())
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}
