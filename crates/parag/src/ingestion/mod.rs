//! Document ingestion: parse, chunk, embed and store uploads

pub mod chunker;
pub mod parser;
mod pipeline;

pub use chunker::TextChunker;
pub use pipeline::{IngestPipeline, IngestReport};
