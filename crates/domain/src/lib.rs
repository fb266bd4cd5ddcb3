//! Tollgate Domain - Core types
//!
//! This crate defines the domain model for the Tollgate API client:
//! persisted session data, access tokens, transport-neutral HTTP values
//! and connector configuration. All types here are pure Rust with no I/O.

pub mod auth;
pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod session;

pub use auth::{AccessToken, AuthError, GrantKind, TokenStatus, token_preview};
pub use config::{ConnectorConfig, TransportOptions, default_user_agent};
pub use error::{DomainError, DomainResult};
pub use request::{ApiRequest, Headers, HttpMethod};
pub use response::ApiResponse;
pub use session::{SessionData, SessionId, SessionValue, keys};
