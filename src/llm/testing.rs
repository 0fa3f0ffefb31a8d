//! Scripted in-memory provider used by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use super::provider::{LlmError, LlmProvider};
use super::types::GenerateRequest;

#[derive(Default)]
pub struct MockLlm {
    /// Scripted `embed` outcomes, one per call, in order: `Some(err)` fails
    /// the call, `None` lets it succeed. A drained queue always succeeds.
    embed_errors: Mutex<VecDeque<Option<LlmError>>>,
    /// Responses to return from `generate`, one per call, in order. A
    /// drained queue yields an empty string.
    generate_responses: Mutex<VecDeque<Result<String, LlmError>>>,
    pub embed_calls: Mutex<Vec<(Vec<String>, Instant)>>,
    pub generate_calls: Mutex<Vec<GenerateRequest>>,
}

impl MockLlm {
    pub fn queue_embed_error(&self, err: LlmError) {
        self.embed_errors.lock().unwrap().push_back(Some(err));
    }

    pub fn queue_embed_ok(&self) {
        self.embed_errors.lock().unwrap().push_back(None);
    }

    pub fn queue_generate(&self, response: Result<String, LlmError>) {
        self.generate_responses.lock().unwrap().push_back(response);
    }

    pub fn embed_batches(&self) -> Vec<Vec<String>> {
        self.embed_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(texts, _)| texts.clone())
            .collect()
    }

    /// Seconds elapsed from `start` to each `embed` call.
    pub fn embed_call_offsets(&self, start: Instant) -> Vec<u64> {
        self.embed_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, at)| at.duration_since(start).as_secs())
            .collect()
    }

    pub fn generate_call_count(&self) -> usize {
        self.generate_calls.lock().unwrap().len()
    }
}

/// Deterministic stand-in vector: first component encodes the text length.
pub fn fake_vector(text: &str) -> Vec<f32> {
    vec![text.chars().count() as f32, 1.0, 0.0]
}

#[async_trait]
impl LlmProvider for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError> {
        self.generate_calls.lock().unwrap().push(request);
        self.generate_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.embed_calls
            .lock()
            .unwrap()
            .push((inputs.to_vec(), Instant::now()));

        if let Some(Some(err)) = self.embed_errors.lock().unwrap().pop_front() {
            return Err(err);
        }

        Ok(inputs.iter().map(|t| fake_vector(t)).collect())
    }
}
