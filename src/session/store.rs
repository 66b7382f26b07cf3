//! Session storage
//!
//! One [`Session`] is live at a time. The token manager and interceptors only
//! see the [`SessionRepository`] trait, so the store is injected rather than
//! reached through global state.

use crate::error::AppError;
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

const SERVICE_NAME: &str = "conduit-client";
const SESSION_ACCOUNT: &str = "session";

/// Read/write access to the current session
pub trait SessionRepository: Send + Sync {
    fn current(&self) -> Option<Session>;
    fn set(&self, session: Session) -> Result<(), AppError>;
    fn clear(&self) -> Result<(), AppError>;

    /// Token of the current session, if any
    fn token(&self) -> Option<String> {
        self.current()
            .map(|session| session.token)
            .filter(|token| !token.is_empty())
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

impl SessionRepository for MemorySessionStore {
    fn current(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, session: Session) -> Result<(), AppError> {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Where a persistent session is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// JSON file in the user config directory
    #[default]
    File,
    /// OS native keyring
    Keyring,
}

/// Session kept in memory and written through to disk or the OS keyring
pub struct PersistentSessionStore {
    backend: SessionBackend,
    file_path: PathBuf,
    cached: MemorySessionStore,
}

impl PersistentSessionStore {
    /// Open the store, loading any previously saved session
    pub fn open(backend: SessionBackend, file_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let file_path = file_path.into();
        let saved = match backend {
            SessionBackend::File => read_session_file(&file_path)?,
            SessionBackend::Keyring => read_keyring()?,
        };
        debug!(?backend, restored = saved.is_some(), "Opened session store");

        let cached = match saved {
            Some(session) => MemorySessionStore::with_session(session),
            None => MemorySessionStore::new(),
        };
        Ok(Self {
            backend,
            file_path,
            cached,
        })
    }

    pub fn backend(&self) -> SessionBackend {
        self.backend
    }

    fn persist(&self, session: Option<&Session>) -> Result<(), AppError> {
        match (self.backend, session) {
            (SessionBackend::File, Some(session)) => write_session_file(&self.file_path, session),
            (SessionBackend::File, None) => remove_session_file(&self.file_path),
            (SessionBackend::Keyring, Some(session)) => write_keyring(session),
            (SessionBackend::Keyring, None) => delete_keyring(),
        }
    }
}

impl SessionRepository for PersistentSessionStore {
    fn current(&self) -> Option<Session> {
        self.cached.current()
    }

    fn set(&self, session: Session) -> Result<(), AppError> {
        self.cached.set(session.clone())?;
        self.persist(Some(&session))
    }

    fn clear(&self) -> Result<(), AppError> {
        self.cached.clear()?;
        self.persist(None)
    }
}

fn read_session_file(path: &Path) -> Result<Option<Session>, AppError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| AppError::Session(format!("Failed to read session file: {}", e)))?;
    match serde_json::from_str(&contents) {
        Ok(session) => Ok(Some(session)),
        Err(e) => {
            warn!("Ignoring unreadable session file {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

fn write_session_file(path: &Path, session: &Session) -> Result<(), AppError> {
    let contents = serde_json::to_string_pretty(session)
        .map_err(|e| AppError::Session(format!("Failed to serialize session: {}", e)))?;
    write_private_file(path, &contents)
}

fn remove_session_file(path: &Path) -> Result<(), AppError> {
    if path.exists() {
        fs::remove_file(path)
            .map_err(|e| AppError::Session(format!("Failed to remove session file: {}", e)))?;
    }
    Ok(())
}

/// Write a file readable only by the current user
pub(crate) fn write_private_file(path: &Path, contents: &str) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Session(format!("Failed to create directory: {}", e)))?;
    }
    fs::write(path, contents)
        .map_err(|e| AppError::Session(format!("Failed to write {}: {}", path.display(), e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)
            .map_err(|e| AppError::Session(format!("Failed to get file metadata: {}", e)))?
            .permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)
            .map_err(|e| AppError::Session(format!("Failed to set file permissions: {}", e)))?;
    }

    Ok(())
}

fn keyring_entry() -> Result<keyring::Entry, AppError> {
    keyring::Entry::new(SERVICE_NAME, SESSION_ACCOUNT)
        .map_err(|e| AppError::Session(format!("Failed to create keyring entry: {}", e)))
}

fn read_keyring() -> Result<Option<Session>, AppError> {
    match keyring_entry()?.get_password() {
        Ok(data) => serde_json::from_str(&data)
            .map(Some)
            .map_err(|e| AppError::Session(format!("Failed to parse stored session: {}", e))),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(AppError::Session(format!("Failed to read keyring: {}", e))),
    }
}

fn write_keyring(session: &Session) -> Result<(), AppError> {
    let data = serde_json::to_string(session)
        .map_err(|e| AppError::Session(format!("Failed to serialize session: {}", e)))?;
    keyring_entry()?
        .set_password(&data)
        .map_err(|e| AppError::Session(format!("Failed to store session: {}", e)))
}

fn delete_keyring() -> Result<(), AppError> {
    match keyring_entry()?.delete_password() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(AppError::Session(format!("Failed to delete session: {}", e))),
    }
}
