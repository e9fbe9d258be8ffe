//! Retrieve-then-generate workflow
//!
//! Each run validates its collection and prompt template, retrieves
//! context, then generates an answer. State lives only for the run.

mod agent;
mod orchestrator;
pub mod state;

pub use agent::QueryAgent;
pub use orchestrator::{RagOutput, RagPipeline, RetrievalStatus};
pub use state::{PipelineStage, RunConfig, SessionState};
