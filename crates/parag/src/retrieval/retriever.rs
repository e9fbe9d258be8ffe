//! Retrieval stage: query text to ranked chunk texts

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::providers::collection_store::{FIELD_CHUNK_TEXT, FIELD_FILENAME};
use crate::providers::{CollectionStoreProvider, EmbeddingProvider};

/// Fields requested for every retrieval hit
pub const RETRIEVAL_FIELDS: [&str; 2] = [FIELD_FILENAME, FIELD_CHUNK_TEXT];

/// Result of one retrieval.
///
/// Embedding or search failures do not abort the run; they produce
/// `Degraded` so generation still runs on an empty context and the caller
/// can tell the user why.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    /// Chunk texts in the store's ranking order
    Complete(Vec<String>),
    /// Retrieval failed; no context is available
    Degraded { reason: String },
}

impl RetrievalOutcome {
    /// Retrieved chunks, empty when degraded
    pub fn chunks(&self) -> &[String] {
        match self {
            RetrievalOutcome::Complete(chunks) => chunks,
            RetrievalOutcome::Degraded { .. } => &[],
        }
    }

    pub fn into_chunks(self) -> Vec<String> {
        match self {
            RetrievalOutcome::Complete(chunks) => chunks,
            RetrievalOutcome::Degraded { .. } => Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, RetrievalOutcome::Degraded { .. })
    }
}

/// Embeds the query and runs a top-k search against one collection
#[derive(Clone)]
pub struct RetrievalStage {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn CollectionStoreProvider>,
    top_k: usize,
    embed_timeout: Duration,
    search_timeout: Duration,
}

impl RetrievalStage {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn CollectionStoreProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            top_k,
            embed_timeout: Duration::from_secs(30),
            search_timeout: Duration::from_secs(15),
        }
    }

    /// Set per-call deadlines for the embedding and search calls
    pub fn with_timeouts(mut self, embed: Duration, search: Duration) -> Self {
        self.embed_timeout = embed;
        self.search_timeout = search;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve chunk texts for `query` from `collection`.
    ///
    /// Never fails; see [`RetrievalOutcome`].
    pub async fn retrieve(&self, collection: &str, query: &str) -> RetrievalOutcome {
        match self.search(collection, query).await {
            Ok(chunks) => {
                tracing::debug!(
                    "Retrieved {} chunks from '{}'",
                    chunks.len(),
                    collection
                );
                RetrievalOutcome::Complete(chunks)
            }
            Err(e) => {
                tracing::warn!("Retrieval from '{}' degraded: {}", collection, e);
                RetrievalOutcome::Degraded {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn search(&self, collection: &str, query: &str) -> Result<Vec<String>> {
        let vector = timeout(self.embed_timeout, self.embedder.embed_one(query))
            .await
            .map_err(|_| Error::Timeout {
                operation: "query embedding",
                secs: self.embed_timeout.as_secs(),
            })??;

        let hits = timeout(
            self.search_timeout,
            self.store
                .search(collection, &vector, self.top_k, &RETRIEVAL_FIELDS),
        )
        .await
        .map_err(|_| Error::Timeout {
            operation: "store search",
            secs: self.search_timeout.as_secs(),
        })??;

        Ok(hits
            .iter()
            .filter_map(|hit| hit.chunk_text().map(str::to_string))
            .collect())
    }
}
