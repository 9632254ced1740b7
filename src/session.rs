// src/session.rs
//! Process-wide holder of the authenticated session.
//!
//! The session lives in memory behind a `watch` channel so observers see
//! every login and logout, and is mirrored into an opaque key-value store
//! under the same keys a browser client would use (`access`, `refresh`,
//! `user`).

use lazy_static::lazy_static;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use crate::error::SessionError;
use crate::models::auth::{Session, UserIdentity};

const ACCESS_KEY: &str = "access";
const REFRESH_KEY: &str = "refresh";
const USER_KEY: &str = "user";

/// Storage substrate for the session.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<(), SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), SessionError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
        Ok(())
    }
}

/// JSON object on disk, rewritten on every mutation.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileKeyValueStore {
    /// A missing file starts empty; an unreadable one is ignored with a warning.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable session file {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Failed to read session file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), SessionError> {
        if entries.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(entries)?;

        // Holds bearer and refresh tokens: owner-only.
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            options.mode(0o600);
            if self.path.exists() {
                std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
            }
        }
        let mut file = options.open(&self.path)?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), SessionError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        self.flush(&entries)
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
        self.flush(&entries)
    }
}

lazy_static! {
    static ref GLOBAL_SESSION: Arc<SessionStore> = Arc::new(SessionStore::in_memory());
}

pub struct SessionStore {
    current: watch::Sender<Option<Session>>,
    backend: Box<dyn KeyValueStore>,
}

impl SessionStore {
    /// Hydrates from `backend` when it already holds a complete session.
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        let initial = Self::hydrate(&backend);
        let (current, _) = watch::channel(initial);
        Self {
            current,
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryKeyValueStore::new())
    }

    /// Shared in-memory store for callers that do not inject their own.
    pub fn global() -> Arc<SessionStore> {
        GLOBAL_SESSION.clone()
    }

    fn hydrate(backend: &dyn KeyValueStore) -> Option<Session> {
        let access_token = backend.get(ACCESS_KEY)?;
        let refresh_token = backend.get(REFRESH_KEY)?;
        let raw_user = backend.get(USER_KEY)?;

        match serde_json::from_str::<UserIdentity>(&raw_user) {
            Ok(user) => Some(Session {
                access_token,
                refresh_token,
                user,
            }),
            Err(e) => {
                tracing::warn!("Stored user entry is malformed, clearing session: {}", e);
                if let Err(e) = backend.clear() {
                    tracing::warn!("Failed to wipe session storage: {}", e);
                }
                None
            }
        }
    }

    /// Persists all three keys or none: a partial write wipes the backend
    /// so a later hydrate never mixes tokens from different logins.
    pub fn set_session(&self, session: Session) -> Result<(), SessionError> {
        let user = serde_json::to_string(&session.user)?;
        if let Err(e) = self.persist(&session, user) {
            tracing::error!("Failed to persist session: {}", e);
            if let Err(clear_err) = self.backend.clear() {
                tracing::warn!("Failed to wipe session storage: {}", clear_err);
            }
            return Err(e);
        }

        tracing::info!("🔐 Session started for {}", session.user.username);
        self.current.send_replace(Some(session));
        Ok(())
    }

    fn persist(&self, session: &Session, user: String) -> Result<(), SessionError> {
        self.backend.set(ACCESS_KEY, session.access_token.clone())?;
        self.backend.set(REFRESH_KEY, session.refresh_token.clone())?;
        self.backend.set(USER_KEY, user)
    }

    pub fn get_session(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current
            .borrow()
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Logout. The in-memory session is always dropped, even if the backing
    /// store cannot be wiped.
    pub fn clear(&self) {
        let previous = self.current.send_replace(None);
        if let Err(e) = self.backend.clear() {
            tracing::warn!("Failed to wipe session storage: {}", e);
        }
        if let Some(session) = previous {
            tracing::info!("🔒 Session cleared for {}", session.user.username);
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
