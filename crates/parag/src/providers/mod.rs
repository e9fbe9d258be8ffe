//! Provider abstractions for embeddings, language models and collection storage
//!
//! Each concern sits behind a trait so the service can switch between local
//! (ONNX, Ollama, in-memory) and remote (OpenAI, Qdrant) backends, and tests
//! can substitute fakes.

pub mod collection_store;
pub mod embedding;
pub mod llm;
pub mod memory;
pub mod ollama;
pub mod onnx;
pub mod openai;
pub mod qdrant;
pub mod retry;

use std::sync::Arc;

use crate::config::{EmbeddingBackend, LlmBackend, RagConfig, StoreBackend};
use crate::error::Result;

pub use collection_store::{ChunkRow, CollectionStoreProvider, Payload, RowFilter, SearchHit};
pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use memory::MemoryCollectionStore;

/// Build the configured embedder
pub async fn build_embedder(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.backend {
        EmbeddingBackend::Onnx => Arc::new(onnx::OnnxEmbedder::new(&config.embeddings).await?),
        EmbeddingBackend::Ollama => Arc::new(ollama::OllamaEmbedder::new(
            &config.embeddings,
            config.timeouts.embedding(),
        )?),
    };
    tracing::info!(
        "Embedding provider: {} ({} dims)",
        embedder.name(),
        embedder.dimensions()
    );
    Ok(embedder)
}

/// Build the configured language model client
pub fn build_llm(config: &RagConfig) -> Result<Arc<dyn LlmProvider>> {
    let llm: Arc<dyn LlmProvider> = match config.llm.backend {
        LlmBackend::OpenAi => Arc::new(openai::OpenAiChat::new(&config.llm, config.timeouts.llm())?),
        LlmBackend::Ollama => Arc::new(ollama::OllamaLlm::new(&config.llm, config.timeouts.llm())?),
    };
    tracing::info!("LLM provider: {} ({})", llm.name(), llm.model());
    Ok(llm)
}

/// Build the configured collection store
pub fn build_store(config: &RagConfig) -> Result<Arc<dyn CollectionStoreProvider>> {
    let store: Arc<dyn CollectionStoreProvider> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryCollectionStore::new()),
        StoreBackend::Qdrant => Arc::new(qdrant::QdrantCollectionStore::new(&config.store)?),
    };
    tracing::info!("Collection store: {}", store.name());
    Ok(store)
}
