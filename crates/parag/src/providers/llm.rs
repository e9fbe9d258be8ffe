//! LLM provider trait for answer generation

use async_trait::async_trait;

use crate::error::Result;

/// Trait for language model invocation
///
/// Implementations:
/// - `OpenAiChat`: OpenAI chat completions (gpt-4o-mini)
/// - `OllamaLlm`: local Ollama server
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a fully rendered prompt and return the generated text verbatim
    async fn invoke(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
