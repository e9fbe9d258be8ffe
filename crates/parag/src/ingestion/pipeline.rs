//! Upload ingestion: PDF bytes to stored, searchable chunks

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::collection_store::{FIELD_CHUNK_TEXT, FIELD_ID};
use crate::providers::{ChunkRow, CollectionStoreProvider, EmbeddingProvider, RowFilter};

use super::chunker::TextChunker;
use super::parser;

/// Rows scanned when picking the next id
const ID_SCAN_LIMIT: usize = 10_000;
const PARSE_TIMEOUT: Duration = Duration::from_secs(60);

/// Summary of one ingested file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub filename: String,
    pub collection: String,
    pub chunks_stored: usize,
    pub timestamp: String,
    pub starting_id: u64,
    pub ending_id: u64,
    /// Whether a probe search against the new rows succeeded
    pub search_ready: bool,
}

/// Parses, chunks, embeds and stores uploaded documents
#[derive(Clone)]
pub struct IngestPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn CollectionStoreProvider>,
    chunker: TextChunker,
    batch_size: usize,
    embed_timeout: Duration,
    store_timeout: Duration,
    /// Serializes id assignment and insert per collection
    write_locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl IngestPipeline {
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn CollectionStoreProvider>,
    ) -> Self {
        Self {
            embedder,
            store,
            chunker: TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap),
            batch_size: config.embeddings.batch_size.max(1),
            embed_timeout: config.timeouts.embedding(),
            store_timeout: config.timeouts.store(),
            write_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn write_lock(&self, collection: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(
            self.write_locks
                .lock()
                .entry(collection.to_string())
                .or_default(),
        )
    }

    /// Ingest one uploaded file into `collection`, creating it if needed
    pub async fn ingest(&self, collection: &str, filename: &str, data: Vec<u8>) -> Result<IngestReport> {
        parser::ensure_pdf(filename)?;
        if collection.trim().is_empty() {
            return Err(Error::CollectionNotFound(collection.to_string()));
        }

        let name = filename.to_string();
        let text = timeout(
            PARSE_TIMEOUT,
            tokio::task::spawn_blocking(move || parser::extract_pdf_text(&name, &data)),
        )
        .await
        .map_err(|_| Error::file_parse(filename, "PDF extraction timed out"))?
        .map_err(|e| Error::internal(format!("PDF extraction task failed: {}", e)))??;

        self.ingest_text(collection, filename, &text).await
    }

    /// Ingest already-extracted text
    pub async fn ingest_text(&self, collection: &str, filename: &str, text: &str) -> Result<IngestReport> {
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Err(Error::file_parse(filename, "No text chunks generated"));
        }
        tracing::info!("Split {} into {} chunks", filename, chunks.len());

        let vectors = self.embed_chunks(&chunks).await?;

        let lock = self.write_lock(collection);
        let guard = lock.lock().await;

        if !self.with_store_timeout(self.store.has_collection(collection)).await? {
            tracing::info!("Collection '{}' does not exist, creating it", collection);
            self.with_store_timeout(
                self.store
                    .create_collection(collection, self.embedder.dimensions()),
            )
            .await?;
        }

        let starting_id = self.next_id(collection).await;
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let probe = vectors.first().cloned();

        let rows: Vec<ChunkRow> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (chunk_text, vector))| ChunkRow {
                id: starting_id + i as u64,
                vector,
                chunk_text,
                filename: filename.to_string(),
                upload_timestamp: timestamp.clone(),
            })
            .collect();
        let count = rows.len();

        let stored = self
            .with_store_timeout(self.store.insert(collection, rows))
            .await?;
        drop(guard);
        tracing::info!(
            "Stored {} chunks for {} in '{}' (ids {}-{})",
            stored,
            filename,
            collection,
            starting_id,
            starting_id + count as u64 - 1
        );

        let search_ready = match probe {
            Some(vector) => self.probe_search(collection, &vector).await,
            None => false,
        };

        Ok(IngestReport {
            filename: filename.to_string(),
            collection: collection.to_string(),
            chunks_stored: stored,
            timestamp,
            starting_id,
            ending_id: starting_id + count as u64 - 1,
            search_ready,
        })
    }

    async fn embed_chunks(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let embedded = timeout(self.embed_timeout, self.embedder.embed(batch))
                .await
                .map_err(|_| Error::Timeout {
                    operation: "chunk embedding",
                    secs: self.embed_timeout.as_secs(),
                })??;
            crate::providers::embedding::ensure_batch_len(batch.len(), embedded.len())?;
            vectors.extend(embedded);
        }
        Ok(vectors)
    }

    /// One past the largest existing id; 0 for an empty collection or on error
    async fn next_id(&self, collection: &str) -> u64 {
        let rows = self
            .with_store_timeout(
                self.store
                    .query(collection, &RowFilter::all(), &[FIELD_ID], ID_SCAN_LIMIT),
            )
            .await;

        match rows {
            Ok(rows) => rows
                .iter()
                .filter_map(|row| row.get(FIELD_ID).and_then(|id| id.as_u64()))
                .max()
                .map_or(0, |max| max + 1),
            Err(e) => {
                tracing::warn!("Could not read existing ids in '{}', starting at 0: {}", collection, e);
                0
            }
        }
    }

    async fn probe_search(&self, collection: &str, vector: &[f32]) -> bool {
        match self
            .with_store_timeout(self.store.search(collection, vector, 1, &[FIELD_CHUNK_TEXT]))
            .await
        {
            Ok(hits) => !hits.is_empty(),
            Err(e) => {
                tracing::warn!("Search check after upload failed: {}", e);
                false
            }
        }
    }

    async fn with_store_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        timeout(self.store_timeout, fut)
            .await
            .map_err(|_| Error::Timeout {
                operation: "store call",
                secs: self.store_timeout.as_secs(),
            })?
    }
}
