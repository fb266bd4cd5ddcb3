//! Request interceptors.
//!
//! An interceptor sees every request the accounts client sends and decides
//! how to pass it on. [`Next`] is the rest of the chain; it is `Copy`, so an
//! interceptor may run it more than once (for a retry).

mod bearer;
mod logging;

use std::sync::Arc;

use async_trait::async_trait;
use tollgate_domain::{ApiRequest, ApiResponse};

use crate::error::ConnectorResult;
use crate::ports::HttpTransport;

pub use bearer::BearerAuth;
pub use logging::RequestLog;

/// Middleware around outgoing requests.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Handles `request`, usually by passing it on through `next`.
    ///
    /// # Errors
    ///
    /// Returns any error from the rest of the chain or from the
    /// interceptor itself.
    async fn intercept(&self, request: ApiRequest, next: Next<'_>)
    -> ConnectorResult<ApiResponse>;
}

/// The remainder of an interceptor chain, ending at the transport.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    transport: &'a dyn HttpTransport,
    interceptors: &'a [Arc<dyn Interceptor>],
}

impl<'a> Next<'a> {
    /// Creates the head of a chain.
    #[must_use]
    pub const fn new(
        transport: &'a dyn HttpTransport,
        interceptors: &'a [Arc<dyn Interceptor>],
    ) -> Self {
        Self {
            transport,
            interceptors,
        }
    }

    /// Runs the rest of the chain for `request`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised down the chain.
    pub async fn run(self, request: ApiRequest) -> ConnectorResult<ApiResponse> {
        match self.interceptors.split_first() {
            Some((head, rest)) => {
                let next = Next {
                    transport: self.transport,
                    interceptors: rest,
                };
                head.intercept(request, next).await
            }
            None => Ok(self.transport.send(request).await?),
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}
