//! `pipeline-agents` — run the legal pipeline from the command line.
//!
//! Progress events are written to stdout as JSON lines; logs go to stderr.
//!
//! ```bash
//! # Analyze a contract, optionally with a concern
//! pipeline-agents analyze lease.txt --question "Is the deposit legal?"
//!
//! # Ask the statute corpus
//! PIPELINE_CORPUS=data/corpus.json pipeline-agents ask "Can my landlord keep the deposit?"
//!
//! # Inspect chains, spend and cached sessions
//! pipeline-agents tiers --tier intern
//! pipeline-agents costs --since 2026-03-01
//! pipeline-agents sessions --limit 5
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use coordination::{
    estimate_tier_cost, tier_info, ChannelSink, JsonFileSessionStore, Route, SessionCache, Tier,
};
use pipeline_agents::corpus::KeywordCorpus;
use pipeline_agents::providers::HttpBackend;
use pipeline_agents::telemetry::{CostReport, JsonlCostLog};
use pipeline_agents::{
    AgentRunner, Orchestrator, PipelineConfig, PipelineError, PipelineOutcome, PipelineRequest,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file (overrides PIPELINE_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tier for this invocation (overrides PIPELINE_TIER)
    #[arg(long, global = true)]
    tier: Option<Tier>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a document: classify, analyze clauses, research, advise
    Analyze {
        /// Plain-text document
        file: PathBuf,
        /// Concern to focus the analysis on
        #[arg(long)]
        question: Option<String>,
        /// Resume a cached session
        #[arg(long)]
        session: Option<String>,
    },
    /// Answer a question from the statute corpus
    Ask { question: String },
    /// Show each agent's fallback chain for the tier
    Tiers,
    /// Summarize the cost log
    Costs {
        /// Only rows on or after this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,
    },
    /// List cached document-analysis sessions
    Sessions {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = PipelineConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Analyze {
            file,
            question,
            session,
        } => {
            let document_text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let request = PipelineRequest {
                document_text: Some(document_text),
                document_name: file.file_name().map(|n| n.to_string_lossy().into_owned()),
                question,
                session_id: session,
                route: Some(Route::DocumentAnalysis),
            };
            run_pipeline(&config, args.tier, request).await
        }
        Command::Ask { question } => {
            let request = PipelineRequest {
                question: Some(question),
                route: Some(Route::CorpusQa),
                ..PipelineRequest::default()
            };
            run_pipeline(&config, args.tier, request).await
        }
        Command::Tiers => {
            let ctx = config.session_context(args.tier);
            let availability = config.credentials().availability();
            let report = serde_json::json!({
                "info": tier_info(&ctx, &availability),
                "estimate": estimate_tier_cost(&ctx, &availability),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Costs { since } => {
            let entries = JsonlCostLog::new(&config.cost_log).read_all().await?;
            let since = since
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| Utc.from_utc_datetime(&dt));
            let report = CostReport::from_entries(&entries, since);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Sessions { limit } => {
            let store = JsonFileSessionStore::open(&config.session_dir).await?;
            let cache = SessionCache::new(store.shared());
            for session in cache.list_sessions(limit).await? {
                let phases: Vec<&str> = session.completed_phases().map(|p| p.as_str()).collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "sessionId": session.session_id,
                        "status": session.status,
                        "phases": phases,
                        "updatedAt": session.updated_at,
                    })
                );
            }
            Ok(())
        }
    }
}

async fn run_pipeline(
    config: &PipelineConfig,
    tier: Option<Tier>,
    request: PipelineRequest,
) -> Result<()> {
    let credentials = config.credentials();
    let availability = credentials.availability();
    if availability.enabled().next().is_none() {
        warn!("No provider API key set; every agent call will fail");
    }
    let backend = HttpBackend::new(credentials, config.timeout)?;
    let cost_log = JsonlCostLog::new(&config.cost_log);
    let runner = AgentRunner::new(Arc::new(backend), availability, Arc::new(cost_log));

    let store = JsonFileSessionStore::open(&config.session_dir).await?;
    let mut orchestrator =
        Orchestrator::new(runner.clone()).with_cache(SessionCache::new(store.shared()));
    if let Some(path) = &config.corpus {
        let corpus = KeywordCorpus::load(path)
            .await
            .with_context(|| format!("loading corpus {}", path.display()))?;
        info!(articles = corpus.len(), "Corpus loaded");
        orchestrator = orchestrator.with_retriever(Arc::new(corpus));
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling pipeline");
                cancel.cancel();
            }
        }
    });

    let (sink, mut events) = ChannelSink::new();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "Unprintable progress event"),
            }
        }
    });

    let ctx = config.session_context(tier);
    let result = orchestrator.run(request, ctx, &sink, &cancel).await;
    drop(sink);
    if let Err(e) = printer.await {
        warn!(error = %e, "Progress printer failed");
    }
    runner.flush_cost_log().await;

    match result {
        Ok(PipelineOutcome::Complete { route, .. }) => {
            info!(route = %route, "Pipeline complete");
            Ok(())
        }
        Ok(PipelineOutcome::Clarification { question }) => {
            info!(question = %question, "Pipeline needs clarification");
            Ok(())
        }
        Err(PipelineError::Cancelled) => {
            warn!("Pipeline cancelled; the session can be resumed");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
