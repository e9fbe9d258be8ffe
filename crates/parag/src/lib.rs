//! parag: retrieval-augmented question answering over policy documents
//!
//! Uploaded PDFs are chunked, embedded and stored in named collections. A
//! query is answered by a two-stage pipeline: the collection and prompt
//! template are validated, the most similar chunks are retrieved, and a
//! language model generates an answer grounded in them.

pub mod config;
pub mod dialogue;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

pub use config::RagConfig;
pub use dialogue::{DialogueEntry, DialogueLog};
pub use error::{Error, Result};
pub use pipeline::{QueryAgent, RagOutput, RagPipeline, RetrievalStatus};
