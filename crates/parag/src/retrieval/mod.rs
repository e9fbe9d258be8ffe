//! Semantic retrieval of chunk text from a collection

mod retriever;

pub use retriever::{RetrievalOutcome, RetrievalStage, RETRIEVAL_FIELDS};
