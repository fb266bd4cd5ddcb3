//! Request value passed through interceptors to the transport

use std::collections::BTreeMap;

use serde::Serialize;
use url::Url;

use super::HttpMethod;
use crate::error::{DomainError, DomainResult};

/// HTTP headers keyed by lowercase name.
pub type Headers = BTreeMap<String, String>;

/// An HTTP request addressed to an absolute URL.
///
/// Header names are stored lowercase, so lookups and overrides are
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Absolute target URL
    pub url: Url,
    /// Request headers
    pub headers: Headers,
    /// Raw request body
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    /// Creates a request without headers or body.
    #[must_use]
    pub const fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub const fn get(url: Url) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Creates a POST request.
    #[must_use]
    pub const fn post(url: Url) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Sets a header, replacing any existing value with the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Builder form of [`set_header`](Self::set_header).
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Looks up a header by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Sets a raw body with its content type.
    #[must_use]
    pub fn with_body(mut self, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.set_header("content-type", content_type);
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidBody`] if the value cannot be serialized.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> DomainResult<Self> {
        let body =
            serde_json::to_vec(value).map_err(|e| DomainError::InvalidBody(e.to_string()))?;
        Ok(self
            .with_body("application/json", body)
            .with_header("accept", "application/json"))
    }

    /// Sets a form-urlencoded body from pre-encoded form data.
    #[must_use]
    pub fn with_form(self, encoded: String) -> Self {
        self.with_body("application/x-www-form-urlencoded", encoded)
    }
}
