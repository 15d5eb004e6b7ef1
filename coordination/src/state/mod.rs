//! Durable, resumable pipeline session state.

pub mod cache;
pub mod store;
pub mod types;

pub use cache::{document_hash, hash_prefix, SessionCache, TIMING_WINDOW};
pub use store::{
    InMemorySessionStore, JsonFileSessionStore, SessionStore, SharedSessionStore, StoreError,
    StoreResult,
};
pub use types::{Phase, PhaseTiming, PipelineSession, SessionPatch, SessionStatus};
