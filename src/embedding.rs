//! Batched embedding client with rate-limit retry.

use std::sync::Arc;
use std::time::Duration;

use crate::core::errors::RagError;
use crate::llm::{LlmError, LlmProvider};

const MAX_ATTEMPTS: u32 = 3;

/// Turns text into fixed-dimension vectors.
///
/// Input is partitioned into `batch_size` chunks submitted sequentially.
/// Each batch is retried on a rate-limit signal with exponential backoff;
/// any other backend error aborts the whole call and prior batch results
/// are discarded — there is no partial-result contract.
#[derive(Clone)]
pub struct EmbeddingClient {
    backend: Arc<dyn LlmProvider>,
    batch_size: usize,
}

impl EmbeddingClient {
    pub fn new(backend: Arc<dyn LlmProvider>, batch_size: usize) -> Self {
        Self {
            backend,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut all_vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let vectors = self.embed_batch_with_retry(batch).await?;
            all_vectors.extend(vectors);
        }

        Ok(all_vectors)
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let texts = [text.to_string()];
        let mut vectors = self.embed(&texts).await?;
        Ok(vectors.remove(0))
    }

    async fn embed_batch_with_retry(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        for attempt in 0..MAX_ATTEMPTS {
            match self.backend.embed(batch).await {
                Ok(vectors) => return Ok(vectors),
                Err(LlmError::RateLimited) if attempt < MAX_ATTEMPTS - 1 => {
                    let wait = 2u64.pow(attempt + 1);
                    tracing::warn!(
                        "Embedding backend rate limited, retrying in {}s (attempt {}/{})",
                        wait,
                        attempt + 1,
                        MAX_ATTEMPTS
                    );
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
                Err(LlmError::RateLimited) => {
                    return Err(RagError::RateLimitExhausted {
                        attempts: MAX_ATTEMPTS,
                    });
                }
                Err(LlmError::Backend(msg)) => {
                    return Err(RagError::EmbeddingBackend(msg));
                }
            }
        }
        unreachable!("retry loop always returns")
    }
}
