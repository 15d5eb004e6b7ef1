//! Session persistence — the storage seam behind the session cache.
//!
//! The cache needs only three operations from a backend: get by id, get by
//! document hash, and merge-upsert. Two engines ship here:
//!
//! - [`InMemorySessionStore`]: process-local map, used by tests and one-shot CLI runs.
//! - [`JsonFileSessionStore`]: one pretty-printed JSON file per session in a directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::types::{PipelineSession, SessionPatch};

/// Error type for session store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Invalid session key: {0}")]
    InvalidKey(String),
}

/// Result type for session store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to a session store
pub type SharedSessionStore = Arc<dyn SessionStore>;

/// Storage backend for [`PipelineSession`] rows.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_by_id(&self, session_id: &str) -> StoreResult<Option<PipelineSession>>;

    /// All sessions for a document hash, most recently updated first.
    async fn get_by_hash(&self, document_hash: &str) -> StoreResult<Vec<PipelineSession>>;

    /// Create the row if missing, then merge `patch` into it.
    async fn upsert_merge(
        &self,
        session_id: &str,
        document_hash: &str,
        patch: SessionPatch,
    ) -> StoreResult<PipelineSession>;

    /// Most recently updated sessions. Backends that cannot scan return none,
    /// which makes timing estimates fall back to their defaults.
    async fn list_recent(&self, _limit: usize) -> StoreResult<Vec<PipelineSession>> {
        Ok(Vec::new())
    }
}

fn sort_recent_first(sessions: &mut [PipelineSession]) {
    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

// ── In-memory ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    rows: RwLock<HashMap<String, PipelineSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedSessionStore {
        Arc::new(self)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_by_id(&self, session_id: &str) -> StoreResult<Option<PipelineSession>> {
        Ok(self.rows.read().await.get(session_id).cloned())
    }

    async fn get_by_hash(&self, document_hash: &str) -> StoreResult<Vec<PipelineSession>> {
        let mut found: Vec<_> = self
            .rows
            .read()
            .await
            .values()
            .filter(|s| s.document_hash == document_hash)
            .cloned()
            .collect();
        sort_recent_first(&mut found);
        Ok(found)
    }

    async fn upsert_merge(
        &self,
        session_id: &str,
        document_hash: &str,
        patch: SessionPatch,
    ) -> StoreResult<PipelineSession> {
        let mut rows = self.rows.write().await;
        let row = rows
            .entry(session_id.to_string())
            .or_insert_with(|| PipelineSession::new(session_id, document_hash));
        row.apply(patch);
        Ok(row.clone())
    }

    async fn list_recent(&self, limit: usize) -> StoreResult<Vec<PipelineSession>> {
        let mut all: Vec<_> = self.rows.read().await.values().cloned().collect();
        sort_recent_first(&mut all);
        all.truncate(limit);
        Ok(all)
    }
}

// ── JSON files ──────────────────────────────────────────────────────────────

/// One `<session_id>.json` file per session under `dir`.
///
/// Writes go through a temp file and rename. A single writer lock serializes
/// read-modify-write cycles within the process.
#[derive(Debug)]
pub struct JsonFileSessionStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSessionStore {
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn shared(self) -> SharedSessionStore {
        Arc::new(self)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> StoreResult<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidKey(session_id.to_string()));
        }
        Ok(self.dir.join(format!("{session_id}.json")))
    }

    async fn read_file(path: &Path) -> StoreResult<Option<PipelineSession>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Deserialization(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_all(&self) -> StoreResult<Vec<PipelineSession>> {
        let mut sessions = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_file(&path).await {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable session file"),
            }
        }
        sort_recent_first(&mut sessions);
        Ok(sessions)
    }
}

#[async_trait]
impl SessionStore for JsonFileSessionStore {
    async fn get_by_id(&self, session_id: &str) -> StoreResult<Option<PipelineSession>> {
        let path = self.path_for(session_id)?;
        Self::read_file(&path).await
    }

    async fn get_by_hash(&self, document_hash: &str) -> StoreResult<Vec<PipelineSession>> {
        let mut all = self.read_all().await?;
        all.retain(|s| s.document_hash == document_hash);
        Ok(all)
    }

    async fn upsert_merge(
        &self,
        session_id: &str,
        document_hash: &str,
        patch: SessionPatch,
    ) -> StoreResult<PipelineSession> {
        let path = self.path_for(session_id)?;
        let _guard = self.write_lock.lock().await;

        let mut row = Self::read_file(&path)
            .await?
            .unwrap_or_else(|| PipelineSession::new(session_id, document_hash));
        row.apply(patch);

        let json = serde_json::to_vec_pretty(&row)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(row)
    }

    async fn list_recent(&self, limit: usize) -> StoreResult<Vec<PipelineSession>> {
        let mut all = self.read_all().await?;
        all.truncate(limit);
        Ok(all)
    }
}
