//! Session cache over the JSON-file store, across store instances.

use chrono::{Duration, Utc};
use coordination::{JsonFileSessionStore, Phase, PhaseTiming, SessionCache, SessionStatus};
use serde_json::json;

const CONTRACT: &str = "Art. 1 The supplier delivers. Art. 2 The buyer pays within 30 days.";

async fn open(dir: &std::path::Path) -> SessionCache {
    SessionCache::new(JsonFileSessionStore::open(dir).await.unwrap().shared())
}

#[tokio::test]
async fn interrupted_session_resumes_after_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let id = {
        let cache = open(dir.path()).await;
        let id = cache.create_session(CONTRACT).await.unwrap();
        cache
            .save_phase_result(&id, Phase::Classifier, json!({"documentType": "supply"}))
            .await
            .unwrap();
        let started = Utc::now();
        cache
            .save_phase_timing(
                &id,
                Phase::Classifier,
                PhaseTiming::between(started, started + Duration::milliseconds(4200)),
            )
            .await
            .unwrap();
        id
    };

    let cache = open(dir.path()).await;
    let found = cache
        .find_session_by_document(CONTRACT)
        .await
        .unwrap()
        .expect("resumable session");
    assert_eq!(found.session_id, id);
    assert_eq!(found.first_incomplete(), Some(Phase::Analyzer));
    assert_eq!(found.phase_timing[&Phase::Classifier].duration_ms, 4200);

    // A different document never matches.
    assert!(cache
        .find_session_by_document("Another contract.")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn completed_sessions_feed_estimates_and_stop_matching() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open(dir.path()).await;
    let id = cache.create_session(CONTRACT).await.unwrap();

    let started = Utc::now();
    for (phase, ms) in [
        (Phase::Classifier, 2000),
        (Phase::Analyzer, 10_000),
        (Phase::Investigator, 6000),
        (Phase::Advisor, 3000),
    ] {
        cache
            .save_phase_result(&id, phase, json!({"ok": true}))
            .await
            .unwrap();
        cache
            .save_phase_timing(
                &id,
                phase,
                PhaseTiming::between(started, started + Duration::milliseconds(ms)),
            )
            .await
            .unwrap();
    }
    cache.mark_complete(&id).await.unwrap();

    let session = cache.load_session(&id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Complete);
    assert!(cache
        .find_session_by_document(CONTRACT)
        .await
        .unwrap()
        .is_none());

    let estimates = cache.average_timings().await.unwrap();
    assert_eq!(estimates[&Phase::Analyzer], 10.0);
    assert_eq!(estimates[&Phase::Advisor], 3.0);

    let listed = cache.list_sessions(10).await.unwrap();
    assert_eq!(listed.len(), 1);
}
