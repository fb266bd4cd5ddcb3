//! Session store port
//!
//! Defines the interface for durable session persistence.

use tollgate_domain::{DomainError, SessionData, SessionId};

/// Errors that can occur during session persistence.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The session id cannot change once the session was loaded.
    #[error("session '{0}' is already loaded; its id cannot change")]
    AlreadyLoaded(SessionId),

    /// The session id is not usable.
    #[error("invalid session id: {0}")]
    InvalidId(#[from] DomainError),
}

/// Durable key/value storage for sessions, keyed by session id.
///
/// Sessions are small and written rarely, so the port is synchronous; this
/// lets a connector flush its state from `Drop`.
pub trait SessionStore: Send + Sync {
    /// Loads persisted data for a session.
    ///
    /// # Returns
    /// `Ok(None)` if nothing has been persisted for `id`.
    ///
    /// # Errors
    /// Returns an error if stored data exists but cannot be read or parsed.
    fn load(&self, id: &SessionId) -> Result<Option<SessionData>, SessionError>;

    /// Persists all session data in one write.
    ///
    /// # Errors
    /// Returns an error if the data cannot be written.
    fn save(&self, id: &SessionId, data: &SessionData) -> Result<(), SessionError>;

    /// Removes persisted data. Removing a missing session succeeds.
    ///
    /// # Errors
    /// Returns an error if existing data cannot be removed.
    fn delete(&self, id: &SessionId) -> Result<(), SessionError>;
}
