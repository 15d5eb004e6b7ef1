//! Pipeline Agents
//!
//! Agent runner and orchestrator for the two-route legal pipeline:
//!
//! ```text
//! request ──▶ leader ──┬─▶ classifier → analyzer → investigator → advisor
//!                      ├─▶ question-prep → corpus-search → corpus-agent
//!                      └─▶ clarification
//! ```
//!
//! - `runner`: one agent call against its tier fallback chain
//! - `agents`: the seven agents, typed inputs and outputs
//! - `orchestrator`: stage sequencing, progress events, session resume
//! - `providers`: HTTP backends per LLM vendor
//! - `telemetry`: append-only cost log and spend reports

pub mod agents;
pub mod config;
pub mod corpus;
pub mod errors;
pub mod json;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod runner;
pub mod sanitize;
pub mod state_machine;
pub mod telemetry;

pub use config::PipelineConfig;
pub use errors::{AgentError, PipelineError, ProviderCallError};
pub use orchestrator::{Orchestrator, PipelineOutcome, PipelineRequest};
pub use runner::{AgentExecutionResult, AgentOverrides, AgentRunner};
