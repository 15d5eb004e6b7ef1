//! Pipeline progress events and the sinks that deliver them.
//!
//! ```text
//! ┌──────────────┐  emit   ┌──────────────┐     ┌──────────────┐
//! │ Orchestrator │────────▶│ ProgressSink │────▶│  Transport   │
//! └──────────────┘         └──────────────┘     │ (SSE, CLI…)  │
//!                                               └──────────────┘
//! ```

pub mod bus;
pub mod types;

pub use bus::{ChannelSink, ProgressSink, RecordingSink};
pub use types::{PipelinePhase, ProgressEvent, Route, StageStatus};
