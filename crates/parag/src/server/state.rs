//! Application state for the RAG server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::dialogue::DialogueLog;
use crate::error::Result;
use crate::generation::GenerationStage;
use crate::ingestion::IngestPipeline;
use crate::pipeline::{QueryAgent, RagPipeline};
use crate::providers::{self, CollectionStoreProvider, EmbeddingProvider, LlmProvider};
use crate::retrieval::RetrievalStage;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn CollectionStoreProvider>,
    llm: Arc<dyn LlmProvider>,
    agent: QueryAgent,
    retrieval: RetrievalStage,
    ingest: IngestPipeline,
}

impl AppState {
    /// Build providers from configuration and wire the pipelines
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing RAG application state...");

        let embedder = providers::build_embedder(&config).await?;
        let store = providers::build_store(&config)?;
        let llm = providers::build_llm(&config)?;

        if !store.health_check().await.unwrap_or(false) {
            tracing::warn!("Collection store '{}' is not reachable yet", store.name());
        }

        Ok(Self::from_parts(config, embedder, store, llm))
    }

    /// Wire the pipelines around already-built providers
    pub fn from_parts(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn CollectionStoreProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        let retrieval = RetrievalStage::new(
            Arc::clone(&embedder),
            Arc::clone(&store),
            config.retrieval.top_k,
        )
        .with_timeouts(config.timeouts.embedding(), config.timeouts.store());
        let generation = GenerationStage::new(Arc::clone(&llm), config.timeouts.llm());
        let pipeline = RagPipeline::new(Arc::clone(&store), retrieval.clone(), generation)
            .with_store_timeout(config.timeouts.store());
        let agent = QueryAgent::new(
            pipeline,
            Arc::new(DialogueLog::new()),
            config.prompt.default_template.clone(),
        );
        let ingest = IngestPipeline::new(&config, Arc::clone(&embedder), Arc::clone(&store));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                embedder,
                store,
                llm,
                agent,
                retrieval,
                ingest,
            }),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedder
    }

    pub fn store(&self) -> &Arc<dyn CollectionStoreProvider> {
        &self.inner.store
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm
    }

    pub fn agent(&self) -> &QueryAgent {
        &self.inner.agent
    }

    pub fn retrieval(&self) -> &RetrievalStage {
        &self.inner.retrieval
    }

    pub fn ingest(&self) -> &IngestPipeline {
        &self.inner.ingest
    }

    pub fn dialogue(&self) -> &Arc<DialogueLog> {
        self.inner.agent.dialogue()
    }

    /// Requested collection, or the configured default
    pub fn collection_or_default(&self, requested: Option<String>) -> String {
        requested
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.inner.config.collections.default_name.clone())
    }
}
