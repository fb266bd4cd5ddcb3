//! In-memory session bound to a durable store.

use std::sync::Arc;

use tollgate_domain::{SessionData, SessionId, SessionValue};

use crate::ports::{SessionError, SessionStore};

/// One identity's authentication state.
///
/// Reads and writes only touch memory; [`save`](Self::save) flushes
/// everything to the store in one write.
pub struct Session {
    id: SessionId,
    data: SessionData,
    store: Arc<dyn SessionStore>,
    loaded: bool,
}

impl Session {
    /// Creates an empty, not yet loaded session.
    pub fn new(id: SessionId, store: Arc<dyn SessionStore>) -> Self {
        Self {
            id,
            data: SessionData::new(),
            store,
            loaded: false,
        }
    }

    /// The session id.
    #[must_use]
    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    /// Rebinds the session to another id.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyLoaded`] once [`load`](Self::load) has
    /// run, unless the id is unchanged.
    pub fn set_id(&mut self, id: SessionId) -> Result<(), SessionError> {
        if id == self.id {
            return Ok(());
        }
        if self.loaded {
            return Err(SessionError::AlreadyLoaded(self.id.clone()));
        }
        self.id = id;
        Ok(())
    }

    /// Returns true once [`load`](Self::load) has run.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Reads persisted state into memory.
    ///
    /// Nothing persisted is not an error: the session simply stays empty.
    ///
    /// # Errors
    ///
    /// Returns the store error if persisted data cannot be read. The
    /// in-memory state is left empty in that case.
    pub fn load(&mut self) -> Result<(), SessionError> {
        self.loaded = true;
        match self.store.load(&self.id) {
            Ok(data) => {
                self.data = data.unwrap_or_default();
                Ok(())
            }
            Err(e) => {
                self.data = SessionData::new();
                Err(e)
            }
        }
    }

    /// Gets a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SessionValue> {
        self.data.get(key)
    }

    /// Gets a string value by key.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get_str(key)
    }

    /// Gets an integer value by key.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.data.get_int(key)
    }

    /// Sets a value in memory.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<SessionValue>) {
        self.data.set(key, value);
    }

    /// Removes a value from memory.
    pub fn remove(&mut self, key: &str) -> Option<SessionValue> {
        self.data.remove(key)
    }

    /// Removes every value from memory.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// All in-memory data.
    #[must_use]
    pub const fn data(&self) -> &SessionData {
        &self.data
    }

    /// Mutable access to the in-memory data.
    pub const fn data_mut(&mut self) -> &mut SessionData {
        &mut self.data
    }

    /// Flushes the in-memory state to the store.
    ///
    /// # Errors
    ///
    /// Returns the store error if the write fails.
    pub fn save(&self) -> Result<(), SessionError> {
        self.store.save(&self.id, &self.data)
    }

    /// Deletes the persisted state and clears memory.
    ///
    /// # Errors
    ///
    /// Returns the store error if the persisted state cannot be removed.
    pub fn destroy(&mut self) -> Result<(), SessionError> {
        self.data.clear();
        self.store.delete(&self.id)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("keys", &self.data.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}
