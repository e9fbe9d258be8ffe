//! Query agent: the pipeline plus default template and dialogue logging

use std::sync::Arc;

use crate::dialogue::DialogueLog;
use crate::error::Result;

use super::orchestrator::{RagOutput, RagPipeline};

/// Long-lived, shareable entry point for answering queries.
///
/// Immutable after construction; per-call settings are arguments.
#[derive(Clone)]
pub struct QueryAgent {
    pipeline: RagPipeline,
    dialogue: Arc<DialogueLog>,
    default_template: String,
}

impl QueryAgent {
    pub fn new(pipeline: RagPipeline, dialogue: Arc<DialogueLog>, default_template: impl Into<String>) -> Self {
        Self {
            pipeline,
            dialogue,
            default_template: default_template.into(),
        }
    }

    /// Answer `query` from `collection`.
    ///
    /// `None` selects the default template. `Some("")` is passed through and
    /// rejected as an invalid prompt. Successful runs are appended to the
    /// dialogue log; failed runs are not.
    pub async fn generate_reply(
        &self,
        query: &str,
        collection: &str,
        template: Option<&str>,
    ) -> Result<RagOutput> {
        let template = template.unwrap_or(self.default_template.as_str());
        let output = self.pipeline.run(query, collection, template).await?;

        if let Some(warning) = output.retrieval.warning() {
            tracing::warn!("{}", warning);
        }

        self.dialogue
            .append(query, output.context.clone(), output.answer.clone());
        Ok(output)
    }

    pub fn dialogue(&self) -> &Arc<DialogueLog> {
        &self.dialogue
    }

    pub fn default_template(&self) -> &str {
        &self.default_template
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TEMPLATE;
    use crate::error::Error;
    use crate::generation::GenerationStage;
    use crate::retrieval::RetrievalStage;
    use crate::testing::{FakeEmbedder, FakeLlm, FakeStore};
    use std::time::Duration;

    fn agent(store: FakeStore, llm: Arc<FakeLlm>) -> QueryAgent {
        let store = Arc::new(store);
        let retrieval = RetrievalStage::new(Arc::new(FakeEmbedder::default()), store.clone(), 5);
        let generation = GenerationStage::new(llm, Duration::from_secs(5));
        QueryAgent::new(
            RagPipeline::new(store, retrieval, generation),
            Arc::new(DialogueLog::new()),
            DEFAULT_TEMPLATE,
        )
    }

    #[tokio::test]
    async fn test_dialogue_records_each_run_in_order() {
        let agent = agent(
            FakeStore::new().with_collection("Organization_1", &["Passwords rotate every 90 days."]),
            Arc::new(FakeLlm::answering("Every 90 days.")),
        );

        let queries = ["How often?", "Who approves?", "What about MFA?"];
        for query in queries {
            agent.generate_reply(query, "Organization_1", None).await.unwrap();
        }

        let entries = agent.dialogue().list();
        assert_eq!(entries.len(), queries.len());
        for (entry, query) in entries.iter().zip(queries) {
            assert_eq!(entry.query, query);
            assert_eq!(entry.response, "Every 90 days.");
            assert_eq!(entry.context, vec!["Passwords rotate every 90 days.".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_default_template_used_when_none() {
        let llm = Arc::new(FakeLlm::answering("a"));
        let agent = agent(FakeStore::new().with_collection("org", &["ctx"]), llm.clone());

        agent.generate_reply("my question", "org", None).await.unwrap();
        let prompt = llm.last_prompt().unwrap();
        assert!(prompt.contains("Question: my question"));
        assert!(prompt.contains("Context: ctx"));
    }

    #[tokio::test]
    async fn test_custom_template_and_empty_template() {
        let llm = Arc::new(FakeLlm::answering("a"));
        let agent = agent(FakeStore::new().with_collection("org", &["ctx"]), llm.clone());

        agent
            .generate_reply("q", "org", Some("<{context}|{question}>"))
            .await
            .unwrap();
        assert_eq!(llm.last_prompt().unwrap(), "<ctx|q>");

        let err = agent.generate_reply("q", "org", Some("")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPrompt(_)));
    }

    #[tokio::test]
    async fn test_failed_runs_are_not_logged() {
        let agent = agent(
            FakeStore::new().with_collection("org", &["ctx"]),
            Arc::new(FakeLlm::failing(true)),
        );

        assert!(agent.generate_reply("q", "org", None).await.is_err());
        assert!(agent.generate_reply("q", "missing", None).await.is_err());
        assert!(agent.dialogue().is_empty());
    }

    #[tokio::test]
    async fn test_shared_agent_concurrent_collections() {
        let agent = agent(
            FakeStore::new()
                .with_collection("a", &["a-doc"])
                .with_collection("b", &["b-doc"]),
            Arc::new(FakeLlm::answering("ok")),
        );

        let (ra, rb) = tokio::join!(
            agent.generate_reply("q", "a", None),
            agent.generate_reply("q", "b", Some("{question}/{context}")),
        );

        assert_eq!(ra.unwrap().context, vec!["a-doc".to_string()]);
        assert_eq!(rb.unwrap().context, vec!["b-doc".to_string()]);
        assert_eq!(agent.dialogue().len(), 2);
    }
}
