//! Authentication domain types

mod types;

pub use types::{
    AccessToken, AuthError, DEFAULT_TOKEN_LIFETIME_SECS, GrantKind, TokenStatus, expiry_after,
    token_preview,
};
