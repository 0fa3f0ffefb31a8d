use async_trait::async_trait;
use thiserror::Error;

use super::types::GenerateRequest;

/// Failure modes of a single backend call.
///
/// `RateLimited` is the only transient signal; callers that retry key off
/// this variant and treat everything else as a hard failure.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("rate limited")]
    RateLimited,
    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "gemini")
    fn name(&self) -> &str;

    /// check if the provider is healthy/reachable
    async fn health_check(&self) -> bool;

    /// single-turn text generation
    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError>;

    /// generate embeddings, one vector per input, in input order
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}
