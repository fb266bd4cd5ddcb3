//! Process-local session store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tollgate_application::ports::{SessionError, SessionStore};
use tollgate_domain::{SessionData, SessionId};

/// Session store that keeps sessions in memory for the life of the
/// process. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionId, SessionData>>,
    saves: AtomicUsize,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the stored session, if any.
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<SessionData> {
        self.sessions.lock().get(id).cloned()
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, id: &SessionId) -> Result<Option<SessionData>, SessionError> {
        Ok(self.get(id))
    }

    fn save(&self, id: &SessionId, data: &SessionData) -> Result<(), SessionError> {
        self.sessions.lock().insert(id.clone(), data.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
        self.sessions.lock().remove(id);
        Ok(())
    }
}
