//! Prompt rendering and answer generation

mod generator;
pub mod prompt;

pub use generator::GenerationStage;
pub use prompt::{build_context, PromptTemplate, CONTEXT_SEPARATOR};
