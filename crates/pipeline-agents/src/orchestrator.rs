//! Pipeline Orchestrator — routes one request through the agent stages.
//!
//! ```text
//! request ─▶ leader ─┬─▶ document-analysis: classifier → analyzer → investigator → advisor
//!                    ├─▶ corpus-qa:         question-prep → corpus-search → corpus-agent
//!                    └─▶ clarification
//! ```
//!
//! Every stage reports `running` then exactly one of `done`, `error` or
//! `skipped`. A stage's [`StageRole`] decides what a failure means: optional
//! stages are skipped and the route continues, a load-bearing failure ends
//! the run. Each run ends with exactly one terminal event, except when it is
//! cancelled, in which case the sink receives nothing further.
//!
//! Document analysis persists each phase result as it completes, so a later
//! run for the same session (or the same document) re-emits the finished
//! phases from cache and resumes at the first missing one. Persistence
//! failures are logged and otherwise ignored.

use std::future::Future;
use std::time::Instant;

use chrono::Utc;
use coordination::{
    document_hash, Phase, PhaseTiming, PipelinePhase, PipelineSession, ProgressEvent,
    ProgressSink, Route, SessionCache, SessionTierContext, StageStatus,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agents::leader::LeaderInput;
use crate::agents::types::PreparedQuestion;
use crate::agents::{
    advisor, analyzer, classifier, corpus_agent, investigator, leader, question_prep, Advice,
    AgentOutput, Analysis, Classification, CorpusAnswer, Investigation, LeaderDecision,
    LeaderRoute,
};
use crate::corpus::{CorpusArticle, SharedCorpusRetriever, DEFAULT_SEARCH_LIMIT};
use crate::errors::{AgentError, PipelineError};
use crate::runner::AgentRunner;
use crate::sanitize::{sanitize_document, sanitize_question, validate_session_id};
use crate::state_machine::{PipelineState, StateMachine};

// ── Stage roles ─────────────────────────────────────────────────────────────

/// Whether a stage's failure ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageRole {
    /// Failure is fatal: `error` event, then the terminal error.
    LoadBearing,
    /// Failure is reported as `skipped` and the route continues.
    Optional,
}

pub fn stage_role(phase: PipelinePhase) -> StageRole {
    match phase {
        PipelinePhase::Investigator | PipelinePhase::QuestionPrep | PipelinePhase::CorpusSearch => {
            StageRole::Optional
        }
        PipelinePhase::Leader
        | PipelinePhase::Classifier
        | PipelinePhase::Analyzer
        | PipelinePhase::Advisor
        | PipelinePhase::CorpusAgent => StageRole::LoadBearing,
    }
}

/// One-line description of a stage result for progress events.
trait StageSummary {
    fn summary(&self) -> String;
}

impl StageSummary for LeaderDecision {
    fn summary(&self) -> String {
        format!("{}: {}", self.route, self.reasoning)
    }
}

impl StageSummary for PreparedQuestion {
    fn summary(&self) -> String {
        self.legal_query.clone()
    }
}

impl StageSummary for Vec<CorpusArticle> {
    fn summary(&self) -> String {
        format!("{} articles", self.len())
    }
}

impl StageSummary for CorpusAnswer {
    fn summary(&self) -> String {
        format!(
            "confidence {:.2}, {} citations",
            self.confidence,
            self.cited_articles.len()
        )
    }
}

impl StageSummary for Classification {
    fn summary(&self) -> String {
        if self.document_type_label.is_empty() {
            self.document_type.clone()
        } else {
            self.document_type_label.clone()
        }
    }
}

impl StageSummary for Analysis {
    fn summary(&self) -> String {
        format!(
            "{} clauses, overall risk {}",
            self.clauses.len(),
            self.overall_risk
        )
    }
}

impl StageSummary for Investigation {
    fn summary(&self) -> String {
        format!("{} findings", self.findings.len())
    }
}

impl StageSummary for Advice {
    fn summary(&self) -> String {
        format!("fairness {:.1}/10", self.fairness_score)
    }
}

// ── Request / outcome ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct PipelineRequest {
    /// Extracted document text, when a file was attached.
    pub document_text: Option<String>,
    pub document_name: Option<String>,
    pub question: Option<String>,
    /// Resume this document-analysis session.
    pub session_id: Option<String>,
    /// Skip the leader and run this route directly.
    pub route: Option<Route>,
}

/// Successful end of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Complete { route: Route, result: Value },
    Clarification { question: String },
}

// ── Orchestrator ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Orchestrator {
    runner: AgentRunner,
    cache: Option<SessionCache>,
    retriever: Option<SharedCorpusRetriever>,
    search_limit: usize,
}

impl Orchestrator {
    pub fn new(runner: AgentRunner) -> Self {
        Self {
            runner,
            cache: None,
            retriever: None,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_cache(mut self, cache: SessionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_retriever(mut self, retriever: SharedCorpusRetriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    pub fn runner(&self) -> &AgentRunner {
        &self.runner
    }

    /// Run one request to completion, reporting progress to `sink`.
    ///
    /// `ctx` selects the tier and disabled agents for this run only; it is
    /// also installed as the ambient context for everything the run awaits.
    pub async fn run(
        &self,
        request: PipelineRequest,
        ctx: SessionTierContext,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let mut machine = StateMachine::new();
        let mut run = Run {
            orchestrator: self,
            ctx: &ctx,
            sink,
            session_id: None,
        };
        info!(sid = %ctx.sid, tier = %ctx.tier, "Pipeline run started");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(sid = %ctx.sid, "Pipeline run cancelled");
                return Err(PipelineError::Cancelled);
            }
            result = ctx.clone().scope(run.execute(request, &mut machine)) => result,
        };

        match result {
            Ok(outcome) => {
                machine.advance(PipelineState::Done, None)?;
                match &outcome {
                    PipelineOutcome::Complete { route, result } => sink.emit(ProgressEvent::Complete {
                        route: *route,
                        result: result.clone(),
                    }),
                    PipelineOutcome::Clarification { question } => {
                        sink.emit(ProgressEvent::Clarification {
                            question: question.clone(),
                        })
                    }
                }
                info!(sid = %ctx.sid, history = %machine.summary(), "Pipeline run finished");
                Ok(outcome)
            }
            Err(error) => {
                let message = error.public_message();
                if let Err(e) = machine.fail(&message) {
                    debug!(error = %e, "State machine already terminal");
                }
                if let (Some(cache), Some(id)) = (&self.cache, &run.session_id) {
                    if let Err(e) = cache.mark_error(id, &message).await {
                        warn!(session_id = %id, error = %e, "Failed to mark session as errored");
                    }
                }
                sink.emit(ProgressEvent::Error {
                    phase: error.phase(),
                    message,
                });
                warn!(sid = %ctx.sid, error = %error, history = %machine.summary(), "Pipeline run failed");
                Err(error)
            }
        }
    }
}

/// Per-run borrowed state.
struct Run<'a> {
    orchestrator: &'a Orchestrator,
    ctx: &'a SessionTierContext,
    sink: &'a dyn ProgressSink,
    session_id: Option<String>,
}

impl Run<'_> {
    async fn execute(
        &mut self,
        request: PipelineRequest,
        machine: &mut StateMachine,
    ) -> Result<PipelineOutcome, PipelineError> {
        let document = request.document_text.as_deref().and_then(sanitize_document);
        // The raw message may be a pasted document, so it gets the document limit.
        let message = request.question.as_deref().and_then(sanitize_document);
        let question = message.as_deref().and_then(sanitize_question);
        if let Some(id) = &request.session_id {
            validate_session_id(id)?;
        }
        if document.is_none() && message.is_none() {
            return Err(PipelineError::InvalidInput(
                "request has neither a document nor a question".into(),
            ));
        }

        machine.advance(PipelineState::LeaderRouting, None)?;

        let decision = match request.route {
            Some(route) => LeaderDecision {
                route: match route {
                    Route::DocumentAnalysis => LeaderRoute::DocumentAnalysis,
                    Route::CorpusQa => LeaderRoute::CorpusQa,
                },
                reasoning: "route requested by caller".into(),
                question: question.clone(),
                // With a document attached, the question focuses the analysis.
                user_context: document.as_ref().and(question.clone()),
                clarification_question: None,
            },
            None => {
                let input = LeaderInput {
                    message: message.as_deref(),
                    has_document: document.is_some(),
                    document_name: request.document_name.as_deref(),
                };
                let orchestrator = self.orchestrator;
                let ctx = self.ctx;
                self.stage(PipelinePhase::Leader, async move {
                    leader::run(&orchestrator.runner, ctx, &input).await
                })
                .await?
                .map(|out| out.value)
                .ok_or_else(|| PipelineError::Collaborator {
                    phase: PipelinePhase::Leader,
                    message: "leader produced no decision".into(),
                })?
            }
        };

        match decision.route {
            LeaderRoute::Clarification => {
                machine.advance(PipelineState::Clarification, Some(&decision.reasoning))?;
                let question = decision
                    .clarification_question
                    .unwrap_or_else(|| "Could you tell me more about what you need?".into());
                Ok(PipelineOutcome::Clarification { question })
            }
            LeaderRoute::CorpusQa => {
                machine.advance(PipelineState::CorpusQa, Some(&decision.reasoning))?;
                let question = decision.question.or(question).ok_or_else(|| {
                    PipelineError::InvalidInput("corpus-qa route needs a question".into())
                })?;
                self.corpus_qa(&question).await
            }
            LeaderRoute::DocumentAnalysis | LeaderRoute::Hybrid => {
                machine.advance(PipelineState::DocumentAnalysis, Some(&decision.reasoning))?;
                // A long pasted message with no file is the document itself.
                let (document, user_context) = match document {
                    Some(doc) => {
                        let context = decision.user_context.or_else(|| {
                            (decision.route == LeaderRoute::Hybrid)
                                .then(|| question.clone())
                                .flatten()
                        });
                        (Some(doc), context)
                    }
                    None => (message, decision.user_context),
                };
                self.document_analysis(document, request.session_id, user_context)
                    .await
            }
        }
    }

    // ── Stage execution ─────────────────────────────────────────────────────

    fn emit_stage(
        &self,
        phase: PipelinePhase,
        status: StageStatus,
        summary: Option<String>,
        output: Option<Value>,
        timing_ms: Option<u64>,
    ) {
        self.sink.emit(ProgressEvent::Stage {
            phase,
            status,
            summary,
            output,
            timing_ms,
            timestamp: Utc::now(),
        });
    }

    /// Run one stage. `Ok(None)` means an optional stage was skipped.
    async fn stage<T, E, Fut>(
        &self,
        phase: PipelinePhase,
        call: Fut,
    ) -> Result<Option<AgentOutput<T>>, PipelineError>
    where
        T: Serialize + StageSummary,
        E: Into<PipelineError>,
        Fut: Future<Output = Result<AgentOutput<T>, E>>,
    {
        self.emit_stage(phase, StageStatus::Running, None, None, None);
        let started = Instant::now();
        let result = call.await;
        let timing_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                let mut summary = output.value.summary();
                match (output.model_key, output.used_fallback) {
                    (Some(key), true) => summary.push_str(&format!(" [{key}, fallback]")),
                    (Some(key), false) => summary.push_str(&format!(" [{key}]")),
                    (None, _) => {}
                }
                info!(phase = %phase, timing_ms, model = ?output.model_key, "Stage done");
                self.emit_stage(
                    phase,
                    StageStatus::Done,
                    Some(summary),
                    serde_json::to_value(&output.value).ok(),
                    Some(timing_ms),
                );
                Ok(Some(output))
            }
            Err(error) => {
                let error: PipelineError = error.into();
                let message = error.public_message();
                match stage_role(phase) {
                    StageRole::Optional => {
                        warn!(phase = %phase, error = %error, "Optional stage skipped");
                        self.emit_stage(
                            phase,
                            StageStatus::Skipped,
                            Some(message),
                            None,
                            Some(timing_ms),
                        );
                        Ok(None)
                    }
                    StageRole::LoadBearing => {
                        warn!(phase = %phase, error = %error, "Load-bearing stage failed");
                        self.emit_stage(
                            phase,
                            StageStatus::Error,
                            Some(message),
                            None,
                            Some(timing_ms),
                        );
                        Err(error)
                    }
                }
            }
        }
    }

    // ── Route B: corpus Q&A ─────────────────────────────────────────────────

    async fn corpus_qa(&self, question: &str) -> Result<PipelineOutcome, PipelineError> {
        let orchestrator = self.orchestrator;
        let ctx = self.ctx;

        let prepared = self
            .stage(PipelinePhase::QuestionPrep, async {
                question_prep::run(&orchestrator.runner, ctx, question).await
            })
            .await?
            .map(|out| out.value)
            .unwrap_or_else(|| PreparedQuestion::passthrough(question));

        let articles = self
            .stage(PipelinePhase::CorpusSearch, async {
                let retriever = orchestrator.retriever.as_ref().ok_or_else(|| {
                    PipelineError::Collaborator {
                        phase: PipelinePhase::CorpusSearch,
                        message: "no corpus configured".into(),
                    }
                })?;
                retriever
                    .search(&prepared, orchestrator.search_limit)
                    .await
                    .map(AgentOutput::local)
                    .map_err(|e| PipelineError::Collaborator {
                        phase: PipelinePhase::CorpusSearch,
                        message: e.to_string(),
                    })
            })
            .await?
            .map(|out| out.value)
            .unwrap_or_default();

        let answer = self
            .stage(PipelinePhase::CorpusAgent, async {
                corpus_agent::run(&orchestrator.runner, ctx, question, &articles).await
            })
            .await?
            .map(|out| out.value)
            .ok_or_else(|| missing(PipelinePhase::CorpusAgent))?;

        Ok(PipelineOutcome::Complete {
            route: Route::CorpusQa,
            result: json!({
                "question": question,
                "preparedQuery": prepared,
                "articlesRetrieved": articles.len(),
                "answer": answer,
            }),
        })
    }

    // ── Route A: document analysis ──────────────────────────────────────────

    async fn document_analysis(
        &mut self,
        document: Option<String>,
        requested_session: Option<String>,
        user_context: Option<String>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let document = document.ok_or_else(|| {
            PipelineError::InvalidInput("document-analysis route needs a document".into())
        })?;
        let cached = self.resolve_session(&document, requested_session).await;

        let estimates = match &self.orchestrator.cache {
            Some(cache) => cache.average_timings().await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read phase timings, using defaults");
                default_estimates()
            }),
            None => default_estimates(),
        };
        self.sink.emit(ProgressEvent::Estimate { seconds: estimates });
        if let Some(id) = &self.session_id {
            self.sink.emit(ProgressEvent::Session {
                session_id: id.clone(),
            });
        }

        let orchestrator = self.orchestrator;
        let ctx = self.ctx;
        let user_context = user_context.as_deref();
        // Cached phases are reused only up to the first missing one.
        let mut reuse = true;

        let classification: Classification = match self.cached(&cached, Phase::Classifier, &mut reuse) {
            Some(c) => c,
            None => self
                .phase(Phase::Classifier, async {
                    classifier::run(&orchestrator.runner, ctx, &document, user_context).await
                })
                .await?
                .ok_or_else(|| missing(PipelinePhase::Classifier))?,
        };

        let analysis: Analysis = match self.cached(&cached, Phase::Analyzer, &mut reuse) {
            Some(a) => a,
            None => self
                .phase(Phase::Analyzer, async {
                    analyzer::run(&orchestrator.runner, ctx, &document, &classification, user_context)
                        .await
                })
                .await?
                .ok_or_else(|| missing(PipelinePhase::Analyzer))?,
        };

        let investigation: Investigation = match self.cached(&cached, Phase::Investigator, &mut reuse) {
            Some(i) => i,
            None => self
                .phase(Phase::Investigator, async {
                    investigator::run(&orchestrator.runner, ctx, &classification, &analysis).await
                })
                .await?
                .unwrap_or_default(),
        };

        let advice: Advice = match self.cached(&cached, Phase::Advisor, &mut reuse) {
            Some(a) => a,
            None => self
                .phase(Phase::Advisor, async {
                    advisor::run(
                        &orchestrator.runner,
                        ctx,
                        &classification,
                        &analysis,
                        &investigation,
                        user_context,
                    )
                    .await
                })
                .await?
                .ok_or_else(|| missing(PipelinePhase::Advisor))?,
        };

        if let (Some(cache), Some(id)) = (&self.orchestrator.cache, &self.session_id) {
            if let Err(e) = cache.mark_complete(id).await {
                warn!(session_id = %id, error = %e, "Failed to mark session complete");
            }
        }

        Ok(PipelineOutcome::Complete {
            route: Route::DocumentAnalysis,
            result: json!({
                "sessionId": self.session_id,
                "classification": classification,
                "analysis": analysis,
                "investigation": investigation,
                "advice": advice,
            }),
        })
    }

    /// Pick the session this run persists under and return its cached state.
    /// Without a cache, or when the store fails, the run proceeds unpersisted.
    async fn resolve_session(
        &mut self,
        document: &str,
        requested: Option<String>,
    ) -> Option<PipelineSession> {
        let cache = self.orchestrator.cache.as_ref()?;

        if let Some(id) = requested {
            match cache.load_session(&id).await {
                Ok(Some(session)) if session.document_hash == document_hash(document) => {
                    info!(session_id = %id, "Resuming requested session");
                    self.session_id = Some(id);
                    return Some(session);
                }
                Ok(Some(_)) => warn!(session_id = %id, "Session belongs to another document, starting fresh"),
                Ok(None) => warn!(session_id = %id, "Requested session not found, starting fresh"),
                Err(e) => {
                    warn!(session_id = %id, error = %e, "Session store unavailable, running uncached");
                    return None;
                }
            }
        }

        match cache.find_session_by_document(document).await {
            Ok(Some(session)) => {
                info!(session_id = %session.session_id, "Resuming session for identical document");
                self.session_id = Some(session.session_id.clone());
                return Some(session);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Session lookup failed, creating a new session"),
        }

        match cache.create_session(document).await {
            Ok(id) => self.session_id = Some(id),
            Err(e) => warn!(error = %e, "Failed to create session, running uncached"),
        }
        None
    }

    /// A cached phase result, re-emitted as `done`. Clears `reuse` on the
    /// first phase that is missing or unreadable.
    fn cached<T: DeserializeOwned>(
        &self,
        session: &Option<PipelineSession>,
        phase: Phase,
        reuse: &mut bool,
    ) -> Option<T> {
        if !*reuse {
            return None;
        }
        let value = session.as_ref().and_then(|s| s.phase(phase)).cloned();
        let parsed = value.clone().and_then(|v| match serde_json::from_value::<T>(v) {
            Ok(t) => Some(t),
            Err(e) => {
                warn!(phase = %phase.as_str(), error = %e, "Cached phase unreadable, recomputing");
                None
            }
        });
        match parsed {
            Some(t) => {
                debug!(phase = %phase.as_str(), "Phase served from cache");
                let timing_ms = session
                    .as_ref()
                    .and_then(|s| s.phase_timing.get(&phase))
                    .map(|t| t.duration_ms);
                self.emit_stage(
                    phase.into(),
                    StageStatus::Done,
                    Some("cached".into()),
                    value,
                    timing_ms,
                );
                Some(t)
            }
            None => {
                *reuse = false;
                None
            }
        }
    }

    /// Run a document-analysis phase and persist its result and timing.
    async fn phase<T, Fut>(&self, phase: Phase, call: Fut) -> Result<Option<T>, PipelineError>
    where
        T: Serialize + StageSummary,
        Fut: Future<Output = Result<AgentOutput<T>, AgentError>>,
    {
        let started_at = Utc::now();
        let Some(output) = self.stage(phase.into(), call).await? else {
            return Ok(None);
        };
        let timing = PhaseTiming::between(started_at, Utc::now());

        if let (Some(cache), Some(id)) = (&self.orchestrator.cache, &self.session_id) {
            match serde_json::to_value(&output.value) {
                Ok(value) => {
                    if let Err(e) = cache.save_phase_result(id, phase, value).await {
                        warn!(session_id = %id, phase = %phase.as_str(), error = %e, "Failed to save phase result");
                    }
                }
                Err(e) => warn!(phase = %phase.as_str(), error = %e, "Phase result not serializable"),
            }
            if let Err(e) = cache.save_phase_timing(id, phase, timing).await {
                warn!(session_id = %id, phase = %phase.as_str(), error = %e, "Failed to save phase timing");
            }
        }
        Ok(Some(output.value))
    }
}

fn default_estimates() -> std::collections::BTreeMap<Phase, f64> {
    Phase::ALL
        .into_iter()
        .map(|p| (p, p.default_estimate_secs()))
        .collect()
}

fn missing(phase: PipelinePhase) -> PipelineError {
    PipelineError::Collaborator {
        phase,
        message: "stage produced no result".into(),
    }
}
