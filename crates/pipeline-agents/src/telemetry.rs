//! Cost telemetry for agent calls.
//!
//! Every successful agent call appends one [`CostLogEntry`]. Two sinks:
//! - `JsonlCostLog`: append-only `.jsonl` file, one row per call
//! - `InMemoryCostLog`: process-local, for tests and one-shot runs
//!
//! Appends are detached from the caller ([`log_cost_detached`]): a failing or
//! slow sink can never fail or delay the pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use coordination::{AgentName, Provider};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// One billable model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLogEntry {
    pub timestamp: DateTime<Utc>,
    pub agent: AgentName,
    pub model_key: String,
    pub provider: Provider,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost_usd: f64,
    pub duration_ms: u64,
    pub used_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
}

#[derive(Debug, Error)]
pub enum CostLogError {
    #[error("cost log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cost log serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Append-only destination for cost rows.
#[async_trait]
pub trait CostSink: Send + Sync {
    async fn append(&self, entry: &CostLogEntry) -> Result<(), CostLogError>;
}

/// Shared reference to a cost sink
pub type SharedCostSink = Arc<dyn CostSink>;

/// Append `entry` on a background task tracked by `tracker`. Failures are
/// logged and dropped.
pub fn log_cost_detached(
    tracker: &TaskTracker,
    sink: SharedCostSink,
    entry: CostLogEntry,
) -> JoinHandle<()> {
    tracker.spawn(async move {
        match sink.append(&entry).await {
            Ok(()) => debug!(
                agent = %entry.agent,
                model = %entry.model_key,
                cost_usd = entry.cost_usd,
                "Logged agent cost"
            ),
            Err(e) => warn!(agent = %entry.agent, error = %e, "Failed to log agent cost"),
        }
    })
}

// ── Sinks ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryCostLog {
    entries: Mutex<Vec<CostLogEntry>>,
}

impl InMemoryCostLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<CostLogEntry> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CostSink for InMemoryCostLog {
    async fn append(&self, entry: &CostLogEntry) -> Result<(), CostLogError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
        Ok(())
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug, Clone)]
pub struct JsonlCostLog {
    path: PathBuf,
}

impl JsonlCostLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row. Malformed lines are skipped with a warning.
    pub async fn read_all(&self) -> Result<Vec<CostLogEntry>, CostLogError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Skipping malformed cost row");
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl CostSink for JsonlCostLog {
    async fn append(&self, entry: &CostLogEntry) -> Result<(), CostLogError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

// ── Aggregation ─────────────────────────────────────────────────────────────

/// Totals for one grouping key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostBucket {
    pub calls: u64,
    pub cost_usd: f64,
    pub tokens_in: u64,
    pub tokens_out: u64,
}

impl CostBucket {
    fn add(&mut self, entry: &CostLogEntry) {
        self.calls += 1;
        self.cost_usd += entry.cost_usd;
        self.tokens_in += entry.tokens_in;
        self.tokens_out += entry.tokens_out;
    }
}

/// Spend summary over a set of cost rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostReport {
    pub total_usd: f64,
    pub calls: u64,
    pub avg_per_call_usd: f64,
    /// Share of calls served by a fallback candidate (0.0–1.0).
    pub fallback_rate: f64,
    pub by_agent: BTreeMap<AgentName, CostBucket>,
    pub by_provider: BTreeMap<Provider, CostBucket>,
    pub by_day: BTreeMap<NaiveDate, CostBucket>,
}

impl CostReport {
    /// Aggregate rows at or after `since` (all rows when `None`).
    pub fn from_entries(entries: &[CostLogEntry], since: Option<DateTime<Utc>>) -> Self {
        let mut report = Self::default();
        let mut fallbacks = 0u64;

        for entry in entries
            .iter()
            .filter(|e| since.map_or(true, |s| e.timestamp >= s))
        {
            report.calls += 1;
            report.total_usd += entry.cost_usd;
            if entry.used_fallback {
                fallbacks += 1;
            }
            report.by_agent.entry(entry.agent).or_default().add(entry);
            report
                .by_provider
                .entry(entry.provider)
                .or_default()
                .add(entry);
            report
                .by_day
                .entry(entry.timestamp.date_naive())
                .or_default()
                .add(entry);
        }

        if report.calls > 0 {
            report.avg_per_call_usd = report.total_usd / report.calls as f64;
            report.fallback_rate = fallbacks as f64 / report.calls as f64;
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(agent: AgentName, provider: Provider, cost: f64, fallback: bool) -> CostLogEntry {
        CostLogEntry {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            agent,
            model_key: "m".into(),
            provider,
            tokens_in: 100,
            tokens_out: 10,
            cost_usd: cost,
            duration_ms: 5,
            used_fallback: fallback,
            sid: None,
        }
    }

    #[tokio::test]
    async fn jsonl_log_appends_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlCostLog::new(dir.path().join("costs/agent-costs.jsonl"));
        log.append(&entry(AgentName::Leader, Provider::Anthropic, 0.01, false))
            .await
            .unwrap();
        log.append(&entry(AgentName::Analyzer, Provider::Gemini, 0.02, true))
            .await
            .unwrap();

        let rows = log.read_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].agent, AgentName::Analyzer);
    }

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlCostLog::new(dir.path().join("none.jsonl"));
        assert!(log.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn detached_append_swallows_sink_errors() {
        struct Broken;
        #[async_trait]
        impl CostSink for Broken {
            async fn append(&self, _entry: &CostLogEntry) -> Result<(), CostLogError> {
                Err(std::io::Error::other("disk full").into())
            }
        }

        let tracker = TaskTracker::new();
        let handle = log_cost_detached(
            &tracker,
            Arc::new(Broken),
            entry(AgentName::Leader, Provider::Groq, 0.0, false),
        );
        // The task itself completes normally; the error stays inside it.
        assert!(handle.await.is_ok());
        tracker.close();
        tracker.wait().await;
    }

    #[test]
    fn report_groups_and_rates() {
        let rows = vec![
            entry(AgentName::Classifier, Provider::Anthropic, 0.01, false),
            entry(AgentName::Classifier, Provider::Gemini, 0.002, true),
            entry(AgentName::Advisor, Provider::Anthropic, 0.03, false),
            entry(AgentName::Advisor, Provider::Anthropic, 0.03, true),
        ];
        let report = CostReport::from_entries(&rows, None);

        assert_eq!(report.calls, 4);
        assert!((report.total_usd - 0.072).abs() < 1e-9);
        assert!((report.avg_per_call_usd - 0.018).abs() < 1e-9);
        assert!((report.fallback_rate - 0.5).abs() < 1e-9);
        assert_eq!(report.by_agent[&AgentName::Classifier].calls, 2);
        assert_eq!(report.by_provider[&Provider::Anthropic].calls, 3);
        assert_eq!(report.by_day.len(), 1);
    }

    #[test]
    fn report_since_filters_old_rows() {
        let rows = vec![entry(AgentName::Leader, Provider::Groq, 0.5, false)];
        let later = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        let report = CostReport::from_entries(&rows, Some(later));
        assert_eq!(report.calls, 0);
        assert_eq!(report.avg_per_call_usd, 0.0);
    }
}
