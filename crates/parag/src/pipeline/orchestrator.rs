//! Two-stage retrieve-then-generate pipeline with up-front validation

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::generation::{GenerationStage, PromptTemplate};
use crate::providers::CollectionStoreProvider;
use crate::retrieval::{RetrievalOutcome, RetrievalStage};

use super::state::{PipelineStage, RunConfig, SessionState};

/// How retrieval went for a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetrievalStatus {
    Complete,
    Degraded { reason: String },
}

impl RetrievalStatus {
    /// User-facing warning when the answer was generated without context
    pub fn warning(&self) -> Option<String> {
        match self {
            RetrievalStatus::Complete => None,
            RetrievalStatus::Degraded { reason } => Some(format!(
                "Document retrieval failed, answer was generated without context: {}",
                reason
            )),
        }
    }
}

/// Output of a successful run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagOutput {
    /// Retrieved chunk texts in ranking order
    pub context: Vec<String>,
    /// Model output, verbatim
    pub answer: String,
    pub retrieval: RetrievalStatus,
}

/// Retrieve-then-generate pipeline.
///
/// Holds only shared collaborators. Collection and template are passed to
/// every [`run`](RagPipeline::run), so concurrent runs never see each
/// other's configuration.
#[derive(Clone)]
pub struct RagPipeline {
    store: Arc<dyn CollectionStoreProvider>,
    retrieval: RetrievalStage,
    generation: GenerationStage,
    store_timeout: Duration,
}

impl RagPipeline {
    pub fn new(
        store: Arc<dyn CollectionStoreProvider>,
        retrieval: RetrievalStage,
        generation: GenerationStage,
    ) -> Self {
        Self {
            store,
            retrieval,
            generation,
            store_timeout: Duration::from_secs(15),
        }
    }

    /// Deadline for the collection existence check
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Answer `query` from `collection_name` using `prompt_template`.
    ///
    /// Fails with `InvalidQuery`, `CollectionNotFound` or `InvalidPrompt`
    /// before any embedding, search or model call. Retrieval problems do not
    /// fail the run; they are reported in [`RagOutput::retrieval`]. A model
    /// failure fails the run with `ModelInvocation`.
    pub async fn run(
        &self,
        query: &str,
        collection_name: &str,
        prompt_template: &str,
    ) -> Result<RagOutput> {
        let config = RunConfig {
            collection_name: collection_name.to_string(),
            prompt_template: prompt_template.to_string(),
        };
        let mut state = SessionState::new(query);

        if state.query.trim().is_empty() {
            return Err(Error::InvalidQuery("query must not be empty".to_string()));
        }

        self.validate_collection(&config.collection_name).await?;
        state.advance(PipelineStage::CollectionValidated)?;

        let template = PromptTemplate::parse(&config.prompt_template)?;
        state.advance(PipelineStage::PromptValidated)?;

        let outcome = self
            .retrieval
            .retrieve(&config.collection_name, &state.query)
            .await;
        let retrieval = match &outcome {
            RetrievalOutcome::Complete(_) => RetrievalStatus::Complete,
            RetrievalOutcome::Degraded { reason } => RetrievalStatus::Degraded {
                reason: reason.clone(),
            },
        };
        state.set_retrieved(outcome.into_chunks())?;

        let answer = self
            .generation
            .generate(&state.query, &state.retrieved_docs, &template)
            .await?;
        state.set_response(answer)?;

        tracing::info!(
            "Answered query against '{}' with {} chunks",
            config.collection_name,
            state.retrieved_docs.len()
        );

        Ok(RagOutput {
            answer: state.response.take().unwrap_or_default(),
            context: state.retrieved_docs,
            retrieval,
        })
    }

    async fn validate_collection(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::CollectionNotFound(name.to_string()));
        }

        let exists = timeout(self.store_timeout, self.store.has_collection(name))
            .await
            .map_err(|_| Error::Timeout {
                operation: "collection check",
                secs: self.store_timeout.as_secs(),
            })??;

        if exists {
            Ok(())
        } else {
            Err(Error::CollectionNotFound(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEmbedder, FakeLlm, FakeStore};

    struct Harness {
        pipeline: RagPipeline,
        store: Arc<FakeStore>,
        embedder: Arc<FakeEmbedder>,
        llm: Arc<FakeLlm>,
    }

    fn harness(store: FakeStore, llm: FakeLlm) -> Harness {
        let store = Arc::new(store);
        let embedder = Arc::new(FakeEmbedder::default());
        let llm = Arc::new(llm);
        let retrieval = RetrievalStage::new(embedder.clone(), store.clone(), 5);
        let generation = GenerationStage::new(llm.clone(), Duration::from_secs(5));
        Harness {
            pipeline: RagPipeline::new(store.clone(), retrieval, generation),
            store,
            embedder,
            llm,
        }
    }

    const TEMPLATE: &str = "Q:{question} C:{context}";

    #[tokio::test]
    async fn test_missing_collection_fails_before_any_call() {
        let h = harness(FakeStore::new().with_collection("org", &["A"]), FakeLlm::answering("x"));

        for name in ["Organization_404", "", "   "] {
            let err = h.pipeline.run("q", name, TEMPLATE).await.unwrap_err();
            assert!(matches!(err, Error::CollectionNotFound(_)), "{name:?}: {err:?}");
        }

        assert_eq!(h.embedder.calls(), 0);
        assert_eq!(h.store.search_calls(), 0);
        assert_eq!(h.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_templates_rejected() {
        let h = harness(FakeStore::new().with_collection("org", &["A"]), FakeLlm::answering("x"));

        for template in ["", "  ", "Q:{question}", "C:{context}", "{question} {context} {extra}"] {
            let err = h.pipeline.run("q", "org", template).await.unwrap_err();
            assert!(matches!(err, Error::InvalidPrompt(_)), "{template:?}: {err:?}");
        }

        assert_eq!(h.embedder.calls(), 0);
        assert_eq!(h.store.search_calls(), 0);
        assert_eq!(h.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_query_rejected_without_store_call() {
        let h = harness(FakeStore::new().with_collection("org", &["A"]), FakeLlm::answering("x"));
        let err = h.pipeline.run("  ", "org", TEMPLATE).await.unwrap_err();

        assert!(matches!(err, Error::InvalidQuery(_)));
        assert_eq!(h.store.has_collection_calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_hits_succeeds_with_empty_context() {
        let h = harness(FakeStore::new().with_collection("org", &[]), FakeLlm::answering("I don't know."));
        let output = h.pipeline.run("what is the VPN policy?", "org", TEMPLATE).await.unwrap();

        assert!(output.context.is_empty());
        assert_eq!(output.answer, "I don't know.");
        assert_eq!(output.retrieval, RetrievalStatus::Complete);
        assert_eq!(h.llm.last_prompt().unwrap(), "Q:what is the VPN policy? C:");
    }

    #[tokio::test]
    async fn test_context_follows_ranking_and_separator() {
        let h = harness(FakeStore::new().with_collection("org", &["A", "B"]), FakeLlm::answering("done"));
        let output = h.pipeline.run("q1", "org", TEMPLATE).await.unwrap();

        assert_eq!(output.context, vec!["A".to_string(), "B".to_string()]);
        assert!(h.llm.last_prompt().unwrap().contains("Q:q1 C:A\n\nB"));
    }

    #[tokio::test]
    async fn test_degraded_retrieval_still_answers() {
        let store = FakeStore::new().with_collection("org", &["A"]).failing_search();
        let h = harness(store, FakeLlm::answering("I don't know."));
        let output = h.pipeline.run("q", "org", TEMPLATE).await.unwrap();

        assert!(output.context.is_empty());
        assert!(matches!(output.retrieval, RetrievalStatus::Degraded { .. }));
        assert!(output.retrieval.warning().is_some());
        assert_eq!(h.llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_model_failure_is_surfaced() {
        let h = harness(FakeStore::new().with_collection("org", &["A"]), FakeLlm::failing(false));
        let err = h.pipeline.run("q", "org", TEMPLATE).await.unwrap_err();

        assert!(matches!(err, Error::ModelInvocation { retryable: false, .. }));
    }

    #[tokio::test]
    async fn test_concurrent_runs_use_their_own_collection() {
        let store = FakeStore::new()
            .with_collection("alpha", &["alpha-1", "alpha-2"])
            .with_collection("beta", &["beta-1"]);
        let h = harness(store, FakeLlm::answering("ok"));

        let mut runs = Vec::new();
        for i in 0..10 {
            let pipeline = h.pipeline.clone();
            let collection = if i % 2 == 0 { "alpha" } else { "beta" };
            runs.push(tokio::spawn(async move {
                (collection, pipeline.run("q", collection, TEMPLATE).await)
            }));
        }

        for run in runs {
            let (collection, output) = run.await.unwrap();
            let output = output.unwrap();
            assert!(!output.context.is_empty());
            assert!(
                output.context.iter().all(|c| c.starts_with(collection)),
                "{collection} saw {:?}",
                output.context
            );
        }

        let searched = h.store.searched.lock().clone();
        assert_eq!(searched.iter().filter(|c| *c == "alpha").count(), 5);
        assert_eq!(searched.iter().filter(|c| *c == "beta").count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_collection_check_times_out_before_embedding() {
        let store = FakeStore::new()
            .with_collection("org", &["A"])
            .slow_has_collection(Duration::from_secs(60));
        let mut h = harness(store, FakeLlm::answering("x"));
        h.pipeline = h.pipeline.with_store_timeout(Duration::from_secs(1));

        let err = h.pipeline.run("q", "org", TEMPLATE).await.unwrap_err();

        assert!(matches!(err, Error::Timeout { .. }), "{err:?}");
        assert_eq!(h.embedder.calls(), 0);
        assert_eq!(h.store.search_calls(), 0);
        assert_eq!(h.llm.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_search_degrades_and_still_generates() {
        let store = Arc::new(
            FakeStore::new()
                .with_collection("org", &["A"])
                .slow_search(Duration::from_secs(60)),
        );
        let llm = Arc::new(FakeLlm::answering("I don't know."));
        let retrieval = RetrievalStage::new(Arc::new(FakeEmbedder::default()), store.clone(), 5)
            .with_timeouts(Duration::from_secs(1), Duration::from_secs(1));
        let generation = GenerationStage::new(llm.clone(), Duration::from_secs(5));
        let pipeline = RagPipeline::new(store.clone(), retrieval, generation);

        let output = pipeline.run("q", "org", TEMPLATE).await.unwrap();

        assert!(output.context.is_empty());
        assert!(matches!(output.retrieval, RetrievalStatus::Degraded { .. }));
        assert_eq!(output.answer, "I don't know.");
        assert_eq!(llm.calls(), 1);
    }
}
