//! Call-counting fakes for pipeline and route tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::collection_store::{FIELD_CHUNK_TEXT, FIELD_FILENAME};
use crate::providers::{
    CollectionStoreProvider, ChunkRow, EmbeddingProvider, LlmProvider, Payload, RowFilter,
    SearchHit,
};

pub const FAKE_DIMS: usize = 2;

/// Embedder returning a fixed-size vector derived from text length
#[derive(Default)]
pub struct FakeEmbedder {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub delay: Option<Duration>,
}

impl FakeEmbedder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Embedder that takes `delay` to answer
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::embedding("model unavailable"));
        }
        Ok(texts.iter().map(|t| vec![t.len() as f32 + 1.0, 1.0]).collect())
    }

    fn dimensions(&self) -> usize {
        FAKE_DIMS
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Store with canned search hits per collection
#[derive(Default)]
pub struct FakeStore {
    hits: HashMap<String, Vec<SearchHit>>,
    pub fail_search: bool,
    pub search_delay: Option<Duration>,
    pub has_collection_delay: Option<Duration>,
    pub has_collection_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub searched: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection whose search returns `chunks` in order
    pub fn with_collection(mut self, name: &str, chunks: &[&str]) -> Self {
        let hits = chunks
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let mut entity = Payload::new();
                entity.insert(FIELD_CHUNK_TEXT.to_string(), (*text).into());
                entity.insert(FIELD_FILENAME.to_string(), format!("{name}.pdf").into());
                SearchHit {
                    id: i as u64,
                    score: 1.0 - i as f32 * 0.1,
                    entity: Some(entity),
                }
            })
            .collect();
        self.hits.insert(name.to_string(), hits);
        self
    }

    /// Add a collection returning exactly `hits`
    pub fn with_hits(mut self, name: &str, hits: Vec<SearchHit>) -> Self {
        self.hits.insert(name.to_string(), hits);
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub fn slow_search(mut self, delay: Duration) -> Self {
        self.search_delay = Some(delay);
        self
    }

    pub fn slow_has_collection(mut self, delay: Duration) -> Self {
        self.has_collection_delay = Some(delay);
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn has_collection_calls(&self) -> usize {
        self.has_collection_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CollectionStoreProvider for FakeStore {
    async fn has_collection(&self, name: &str) -> Result<bool> {
        self.has_collection_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if let Some(delay) = self.has_collection_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.hits.contains_key(name))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.hits.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_collection(&self, _name: &str, _dimension: usize) -> Result<()> {
        Err(Error::Store("read-only fake".to_string()))
    }

    async fn drop_collection(&self, _name: &str) -> Result<()> {
        Err(Error::Store("read-only fake".to_string()))
    }

    async fn insert(&self, _collection: &str, _rows: Vec<ChunkRow>) -> Result<usize> {
        Err(Error::Store("read-only fake".to_string()))
    }

    async fn search(
        &self,
        collection: &str,
        _vector: &[f32],
        limit: usize,
        _output_fields: &[&str],
    ) -> Result<Vec<SearchHit>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.searched.lock().push(collection.to_string());
        tokio::task::yield_now().await;
        if let Some(delay) = self.search_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_search {
            return Err(Error::store_unavailable("connection refused"));
        }
        let hits = self
            .hits
            .get(collection)
            .ok_or_else(|| Error::CollectionNotFound(collection.to_string()))?;
        Ok(hits.iter().take(limit).cloned().collect())
    }

    async fn query(
        &self,
        _collection: &str,
        _filter: &RowFilter,
        _output_fields: &[&str],
        _limit: usize,
    ) -> Result<Vec<Payload>> {
        Ok(Vec::new())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Language model that records every prompt it receives
pub struct FakeLlm {
    answer: Option<String>,
    retryable: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            retryable: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(retryable: bool) -> Self {
        Self {
            answer: None,
            retryable,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        match &self.answer {
            Some(answer) => Ok(answer.clone()),
            None => Err(Error::model("quota exceeded", self.retryable)),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}
