//! Generation stage: retrieved chunks plus question to a grounded answer

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::providers::LlmProvider;

use super::prompt::{build_context, PromptTemplate};

/// Renders the prompt and invokes the language model
#[derive(Clone)]
pub struct GenerationStage {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl GenerationStage {
    pub fn new(llm: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Generate an answer for `query` grounded in `chunks`.
    ///
    /// The model output is returned verbatim. Any failure, including a
    /// missed deadline, surfaces as `ModelInvocation`.
    pub async fn generate(
        &self,
        query: &str,
        chunks: &[String],
        template: &PromptTemplate,
    ) -> Result<String> {
        let context = build_context(chunks);
        let prompt = template.render(query, &context);

        tracing::debug!(
            "Invoking {} with {} chunks ({} prompt chars)",
            self.llm.model(),
            chunks.len(),
            prompt.len()
        );

        timeout(self.timeout, self.llm.invoke(&prompt))
            .await
            .map_err(|_| Error::Timeout {
                operation: "model invocation",
                secs: self.timeout.as_secs(),
            })
            .and_then(|result| result)
            .map_err(Error::into_model_failure)
    }
}
