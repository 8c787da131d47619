//! Durable storage for the current session.
//!
//! A session is stored as a single record holding both the token and the
//! cached profile, so the two are always written and removed together. The
//! store does no network access and no expiry checks; whether the token still
//! works is for `IdentityClient::verify` to find out.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_auth::{AuthToken, Session, User};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Session storage abstraction.
pub trait SessionStore: Send + Sync {
    /// Persist token and profile as one record, replacing any previous one.
    fn save(&self, token: &AuthToken, user: &User) -> Result<(), SessionStoreError>;

    /// The stored session, or `None` when nothing usable is stored.
    ///
    /// A missing, partial or corrupt record is reported as `None`.
    fn load(&self) -> Option<Session>;

    /// Remove the stored session. Idempotent.
    fn clear(&self) -> Result<(), SessionStoreError>;

    /// The stored token alone, without decoding the profile.
    ///
    /// May be `Some` while [`load`](Self::load) is `None` (damaged profile).
    fn token(&self) -> Option<AuthToken>;

    /// Cheap existence check that does not decode the profile.
    fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// When the current record was written, if the store tracks it.
    fn saved_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session storage I/O failed at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode session record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("session store lock poisoned")]
    Poisoned,
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory session store for tests/dev.
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

impl SessionStore for MemorySessionStore {
    fn save(&self, token: &AuthToken, user: &User) -> Result<(), SessionStoreError> {
        let mut slot = self
            .session
            .write()
            .map_err(|_| SessionStoreError::Poisoned)?;
        *slot = Some(Session::new(token.clone(), user.clone()));
        Ok(())
    }

    fn load(&self) -> Option<Session> {
        let slot = self.session.read().ok()?;
        (*slot)
            .clone()
            .filter(|s| !s.token.as_str().is_empty())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        let mut slot = self
            .session
            .write()
            .map_err(|_| SessionStoreError::Poisoned)?;
        *slot = None;
        Ok(())
    }

    fn token(&self) -> Option<AuthToken> {
        let slot = self.session.read().ok()?;
        (*slot)
            .as_ref()
            .map(|s| s.token.clone())
            .filter(|token| !token.as_str().is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File-backed store
// ─────────────────────────────────────────────────────────────────────────────

/// On-disk shape of the session record.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    token: AuthToken,
    user: User,
    saved_at: DateTime<Utc>,
}

/// Only the token, for `has_token`; the profile is skipped by serde.
#[derive(Debug, Deserialize)]
struct TokenField {
    #[serde(default)]
    token: Option<String>,
}

/// JSON file session store.
///
/// Writes go to a fresh temp file in the same directory which is then
/// renamed over the record, so a crash mid-write leaves either the old record
/// or the new one, and overlapping saves end with one complete record.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SessionStoreError {
        SessionStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_raw(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Some(raw),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(path = ?self.path, "failed to read session record: {err}");
                None
            }
        }
    }

    fn read_record(&self) -> Option<StoredSession> {
        let raw = self.read_raw()?;
        match serde_json::from_str::<StoredSession>(&raw) {
            Ok(record) if !record.token.as_str().is_empty() => Some(record),
            Ok(_) => {
                tracing::warn!(path = ?self.path, "session record has an empty token; ignoring");
                None
            }
            Err(err) => {
                tracing::warn!(path = ?self.path, "corrupt session record ignored: {err}");
                None
            }
        }
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, token: &AuthToken, user: &User) -> Result<(), SessionStoreError> {
        let record = StoredSession {
            token: token.clone(),
            user: user.clone(),
            saved_at: Utc::now(),
        };
        let payload = serde_json::to_vec_pretty(&record)?;

        let dir = self.dir();
        fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        // Each save gets its own uniquely named, owner-only temp file in the
        // same directory; concurrent saves race only on the final rename.
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(&payload).map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;
        Ok(())
    }

    fn load(&self) -> Option<Session> {
        self.read_record()
            .map(|record| Session::new(record.token, record.user))
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn token(&self) -> Option<AuthToken> {
        self.read_raw()
            .and_then(|raw| serde_json::from_str::<TokenField>(&raw).ok())
            .and_then(|field| field.token)
            .filter(|token| !token.is_empty())
            .map(AuthToken::new)
    }

    fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.read_record().map(|record| record.saved_at)
    }
}

/// Resolve the default session record path:
/// `{app_data_dir}/storefront/session.json`.
pub fn default_session_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    let mut path = base;
    path.push("storefront");
    path.push("session.json");
    Ok(path)
}
