//! Server-side session store.
//!
//! Blobs live in a concurrent map keyed by a random session id; the caller
//! only carries the id cookie. Used where the cookie-carried store cannot
//! work, e.g. behind plain HTTP.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::header::{HeaderMap, SET_COOKIE};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::observability::metrics;
use crate::session::cookie::CookieAttributes;
use crate::session::{SessionError, SessionStore};

/// A stored blob and its expiry (seconds since epoch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBlob {
    pub data: String,
    pub expires_at: u64,
}

impl StoredBlob {
    fn is_live(&self, now: u64) -> bool {
        self.expires_at > now
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A thread-safe, expiring blob store.
#[derive(Clone)]
pub struct MemorySessionStore {
    entries: Arc<DashMap<String, StoredBlob>>,
    cookie: CookieAttributes,
    ttl_secs: u64,
    persistence_path: Option<PathBuf>,
}

impl MemorySessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            cookie: CookieAttributes::from_config(config),
            ttl_secs: config.ttl_secs,
            persistence_path: config.persistence_path.as_ref().map(PathBuf::from),
        }
    }

    /// Create a store and load the snapshot file, if one exists.
    /// Expired entries in the snapshot are dropped.
    pub fn load(config: &SessionConfig) -> Result<Self, SessionError> {
        let store = Self::new(config);
        if let Some(path) = store.persistence_path.as_deref().filter(|p| p.exists()) {
            let reader = BufReader::new(File::open(path)?);
            let snapshot: HashMap<String, StoredBlob> = serde_json::from_reader(reader)?;

            let now = now_secs();
            for (id, blob) in snapshot.into_iter().filter(|(_, b)| b.is_live(now)) {
                store.entries.insert(id, blob);
            }
            metrics::record_session_entries(store.entries.len());
            tracing::info!(path = ?path, entries = store.entries.len(), "Loaded session snapshot");
        }
        Ok(store)
    }

    /// Write the snapshot file, if persistence is configured.
    pub fn save(&self) -> Result<(), SessionError> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let snapshot: HashMap<_, _> = self
            .entries
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        write_snapshot(path, &snapshot)?;
        tracing::info!(path = ?path, entries = snapshot.len(), "Saved session snapshot");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The caller's session id, if it carries a well-formed one.
    /// Whether the id was ever issued is not checked here.
    fn session_id(&self, request: &HeaderMap) -> Option<String> {
        self.cookie
            .read(request)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .map(|id| id.to_string())
    }
}

fn write_snapshot(path: &Path, snapshot: &HashMap<String, StoredBlob>) -> Result<(), SessionError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, snapshot)?;
    Ok(())
}

impl SessionStore for MemorySessionStore {
    fn store(&self, request: &HeaderMap, blob: String) -> Result<HeaderMap, SessionError> {
        // Only ids this store issued are reused.
        let id = self
            .session_id(request)
            .filter(|id| self.entries.contains_key(id))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, self.cookie.set_cookie(&id)?);

        self.entries.insert(
            id,
            StoredBlob {
                data: blob,
                expires_at: now_secs().saturating_add(self.ttl_secs),
            },
        );
        metrics::record_session_entries(self.entries.len());
        Ok(headers)
    }

    fn retrieve(&self, request: &HeaderMap) -> Result<Option<String>, SessionError> {
        let Some(id) = self.session_id(request) else {
            return Ok(None);
        };
        let now = now_secs();
        let blob = self
            .entries
            .get(&id)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.data.clone());
        if blob.is_none() {
            self.entries.remove_if(&id, |_, entry| !entry.is_live(now));
        }
        Ok(blob)
    }

    fn purge_expired(&self) -> usize {
        let now = now_secs();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        let after = self.entries.len();
        metrics::record_session_entries(after);
        before.saturating_sub(after)
    }

    fn persist(&self) -> Result<(), SessionError> {
        self.save()
    }
}
