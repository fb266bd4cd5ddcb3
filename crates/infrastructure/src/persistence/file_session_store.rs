//! Session persistence on the local file system.
//!
//! Each session is one JSON document named after its id:
//! - Default location: ~/.tollgate/sessions/<id>.json
//! - Writes go to a temporary file that is renamed into place
//! - On Unix the file is readable by its owner only (0600)

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tollgate_application::ports::{SessionError, SessionStore};
use tollgate_domain::{SessionData, SessionId};

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

/// Current session file schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Session directory relative to the home directory.
const SESSION_DIR: &str = ".tollgate/sessions";

#[derive(Serialize)]
struct SessionDocumentRef<'a> {
    schema_version: u32,
    id: &'a SessionId,
    data: &'a SessionData,
}

#[derive(Deserialize)]
struct SessionDocument {
    schema_version: u32,
    #[serde(default)]
    data: SessionData,
}

/// Session store keeping one JSON file per session id in a directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Creates a store rooted at `dir`. The directory is created on first
    /// save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the per-user default session directory.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(SESSION_DIR))
    }

    /// Creates a store in the per-user default directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the home directory cannot be determined.
    pub fn at_default_location() -> Result<Self, SessionError> {
        Self::default_dir()
            .map(Self::new)
            .ok_or_else(|| io::Error::other("could not determine home directory").into())
    }

    /// The directory holding session files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing session `id`.
    #[must_use]
    pub fn path_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Writes `contents` to a new file that only its owner can read on Unix.
    fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // A leftover temp file keeps its old mode on open.
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(contents)?;
        file.sync_all()
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, id: &SessionId) -> Result<Option<SessionData>, SessionError> {
        let path = self.path_for(id);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no saved session");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let document: SessionDocument = from_json_bytes(&bytes)
            .map_err(|e| SessionError::Serialization(format!("{}: {e}", path.display())))?;

        if document.schema_version > SCHEMA_VERSION {
            return Err(SessionError::Serialization(format!(
                "{}: unsupported schema version {}",
                path.display(),
                document.schema_version
            )));
        }

        tracing::debug!(path = %path.display(), keys = document.data.len(), "session loaded");
        Ok(Some(document.data))
    }

    fn save(&self, id: &SessionId, data: &SessionData) -> Result<(), SessionError> {
        std::fs::create_dir_all(&self.dir)?;

        let document = SessionDocumentRef {
            schema_version: SCHEMA_VERSION,
            id,
            data,
        };
        let contents = to_json_stable_bytes(&document)
            .map_err(|e| SessionError::Serialization(e.to_string()))?;

        let path = self.path_for(id);
        let tmp = self.dir.join(format!(".{id}.json.tmp"));
        Self::write_private(&tmp, &contents)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::debug!(path = %path.display(), "session saved");
        Ok(())
    }

    fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use tollgate_domain::keys;

    fn id(s: &str) -> SessionId {
        SessionId::new(s).unwrap()
    }

    fn sample() -> SessionData {
        let mut data = SessionData::new();
        data.set(keys::USERNAME, "alice");
        data.set(keys::ACCESS_TOKEN, "tok-1");
        data.set(keys::EXPIRES, 1_700_003_600_i64);
        data
    }

    #[test]
    fn test_default_dir_is_under_home() {
        if let Some(dir) = FileSessionStore::default_dir() {
            assert!(dir.ends_with(".tollgate/sessions"));
        }
    }

    #[test]
    fn test_load_missing_is_none() {
        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path().join("sessions"));

        assert_eq!(store.load(&id("nobody")).unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path().join("sessions"));

        store.save(&id("alice"), &sample()).unwrap();

        assert_eq!(store.load(&id("alice")).unwrap(), Some(sample()));
    }

    #[test]
    fn test_file_layout() {
        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path());

        store.save(&id("alice"), &sample()).unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path_for(&id("alice"))).unwrap()).unwrap();
        assert_eq!(json["schema_version"], 1);
        assert_eq!(json["id"], "alice");
        assert_eq!(json["data"]["username"], "alice");
        assert_eq!(json["data"]["expires"], 1_700_003_600_i64);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path());

        store.save(&id("alice"), &sample()).unwrap();
        store.save(&id("alice"), &sample()).unwrap();

        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["alice.json".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path());
        store.save(&id("alice"), &sample()).unwrap();

        let mode = std::fs::metadata(store.path_for(&id("alice")))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_leftover_temp_file_is_made_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let leftover = temp.path().join(".alice.json.tmp");
        std::fs::write(&leftover, "stale").unwrap();
        std::fs::set_permissions(&leftover, std::fs::Permissions::from_mode(0o644)).unwrap();

        FileSessionStore::write_private(&leftover, b"{}").unwrap();

        let mode = std::fs::metadata(&leftover).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read(&leftover).unwrap(), b"{}");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path());
        std::fs::write(store.path_for(&id("alice")), "{not json").unwrap();

        assert!(matches!(
            store.load(&id("alice")),
            Err(SessionError::Serialization(_))
        ));
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path());
        std::fs::write(
            store.path_for(&id("alice")),
            r#"{"schema_version": 99, "id": "alice", "data": {}}"#,
        )
        .unwrap();

        assert!(store.load(&id("alice")).is_err());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path());
        store.save(&id("alice"), &sample()).unwrap();

        store.delete(&id("alice")).unwrap();
        store.delete(&id("alice")).unwrap();

        assert_eq!(store.load(&id("alice")).unwrap(), None);
    }
}
