//! Tollgate Application - Session and token lifecycle
//!
//! This crate holds the connector logic: the session bound to a store,
//! the `OAuth2` token provider, the interceptor chain and the accounts
//! client. External systems are reached only through the [`ports`].

pub mod accounts_client;
pub mod auth;
pub mod connector;
pub mod error;
pub mod interceptor;
pub mod ports;
pub mod session;

#[cfg(test)]
mod test_support;

pub use accounts_client::AccountsClient;
pub use auth::TokenProvider;
pub use connector::{ConnectionState, Connector};
pub use error::{ConnectorError, ConnectorResult};
pub use interceptor::{BearerAuth, Interceptor, Next, RequestLog};
pub use ports::{
    Clock, HttpTransport, SessionError, SessionStore, TransportError, TransportFactory,
};
pub use session::Session;
