//! Session Cache — resumable per-document phase results and timing history.
//!
//! Session ids are `<hash16>-<rand12>`: the first half is derived from the
//! document content so identical documents share a partition, the second half
//! is random so every run is independently resumable.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info};

use super::store::{SharedSessionStore, StoreError, StoreResult};
use super::types::{Phase, PhaseTiming, PipelineSession, SessionPatch, SessionStatus};

/// Number of completed sessions averaged for phase estimates.
pub const TIMING_WINDOW: usize = 30;

/// Content hash used as the session id prefix and lookup key.
pub fn document_hash(document_text: &str) -> String {
    let digest = blake3::hash(document_text.as_bytes());
    digest.to_hex()[..16].to_string()
}

/// The hash prefix of a session id.
pub fn hash_prefix(session_id: &str) -> &str {
    session_id.split('-').next().unwrap_or(session_id)
}

#[derive(Clone)]
pub struct SessionCache {
    store: SharedSessionStore,
}

impl SessionCache {
    pub fn new(store: SharedSessionStore) -> Self {
        Self { store }
    }

    /// Persist an empty session for `document_text` and return its id.
    pub async fn create_session(&self, document_text: &str) -> StoreResult<String> {
        let hash = document_hash(document_text);
        let suffix: String = uuid::Uuid::new_v4().simple().to_string()[..12].to_string();
        let session_id = format!("{hash}-{suffix}");
        self.store
            .upsert_merge(&session_id, &hash, SessionPatch::default())
            .await?;
        info!(session_id = %session_id, "Created pipeline session");
        Ok(session_id)
    }

    pub async fn load_session(&self, session_id: &str) -> StoreResult<Option<PipelineSession>> {
        self.store.get_by_id(session_id).await
    }

    /// The most recently updated unfinished session for this exact content
    /// that has at least one completed phase. Errored sessions count, so a
    /// retry after a fatal stage reuses what already finished.
    pub async fn find_session_by_document(
        &self,
        document_text: &str,
    ) -> StoreResult<Option<PipelineSession>> {
        let hash = document_hash(document_text);
        let found = self
            .store
            .get_by_hash(&hash)
            .await?
            .into_iter()
            .find(|s| {
                s.status != SessionStatus::Complete
                    && s.advice.is_none()
                    && s.completed_phases().next().is_some()
            });
        if let Some(s) = &found {
            debug!(session_id = %s.session_id, "Found resumable session for document");
        }
        Ok(found)
    }

    /// Record a phase result. A null value is ignored; a written phase is
    /// never cleared.
    pub async fn save_phase_result(
        &self,
        session_id: &str,
        phase: Phase,
        value: Value,
    ) -> StoreResult<()> {
        self.merge(session_id, SessionPatch::result(phase, value))
            .await
    }

    pub async fn save_phase_timing(
        &self,
        session_id: &str,
        phase: Phase,
        timing: PhaseTiming,
    ) -> StoreResult<()> {
        self.merge(session_id, SessionPatch::timing(phase, timing))
            .await
    }

    pub async fn mark_complete(&self, session_id: &str) -> StoreResult<()> {
        self.merge(
            session_id,
            SessionPatch::status(SessionStatus::Complete, None),
        )
        .await
    }

    pub async fn mark_error(&self, session_id: &str, message: &str) -> StoreResult<()> {
        self.merge(
            session_id,
            SessionPatch::status(SessionStatus::Error, Some(message.to_string())),
        )
        .await
    }

    /// Most recently updated sessions.
    pub async fn list_sessions(&self, limit: usize) -> StoreResult<Vec<PipelineSession>> {
        self.store.list_recent(limit).await
    }

    /// Average duration in seconds of each phase over the last
    /// [`TIMING_WINDOW`] completed sessions, rounded to 0.1 s. Phases with no
    /// history keep their default estimate.
    pub async fn average_timings(&self) -> StoreResult<BTreeMap<Phase, f64>> {
        // Scan a wider window since in-progress and failed rows are skipped.
        let recent = self.store.list_recent(TIMING_WINDOW * 4).await?;
        let complete = recent
            .iter()
            .filter(|s| s.advice.is_some() && !s.phase_timing.is_empty())
            .take(TIMING_WINDOW);

        let mut sums: BTreeMap<Phase, (f64, u32)> = BTreeMap::new();
        for session in complete {
            for (phase, timing) in &session.phase_timing {
                if timing.duration_ms > 0 {
                    let entry = sums.entry(*phase).or_insert((0.0, 0));
                    entry.0 += timing.duration_ms as f64 / 1000.0;
                    entry.1 += 1;
                }
            }
        }

        Ok(Phase::ALL
            .into_iter()
            .map(|phase| {
                let secs = match sums.get(&phase) {
                    Some((sum, n)) if *n > 0 => (sum / *n as f64 * 10.0).round() / 10.0,
                    _ => phase.default_estimate_secs(),
                };
                (phase, secs)
            })
            .collect())
    }

    async fn merge(&self, session_id: &str, patch: SessionPatch) -> StoreResult<()> {
        let hash = hash_prefix(session_id);
        if hash.is_empty() {
            return Err(StoreError::InvalidKey(session_id.to_string()));
        }
        self.store.upsert_merge(session_id, hash, patch).await?;
        Ok(())
    }
}
