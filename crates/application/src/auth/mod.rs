//! Token acquisition and refresh.
//!
//! [`TokenProvider`] speaks the `OAuth2` password and refresh-token grants
//! against the token endpoint and owns the current access token.

mod grant;
mod token_provider;

pub use token_provider::TokenProvider;
