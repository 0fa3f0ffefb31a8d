use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::provider::{LlmError, LlmProvider};
use super::types::GenerateRequest;
use crate::core::config::AppConfig;

/// Gemini REST backend for both text generation and embeddings.
///
/// Holds one long-lived `reqwest::Client`; constructed once at startup and
/// shared across all callers. Rate limiting (HTTP 429) is reported as
/// `LlmError::RateLimited` and retried by the embedding client, not here.
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    llm_model: String,
    embedding_model: String,
}

impl GeminiProvider {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            api_key: config.gemini_api_key.clone(),
            llm_model: config.llm_model.clone(),
            embedding_model: config.embedding_model.clone(),
        }
    }

    fn classify(status: StatusCode, body: String) -> LlmError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            LlmError::RateLimited
        } else {
            LlmError::Backend(format!("{}: {}", status, body))
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/models/{}", self.base_url, self.llm_model);
        let res = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await;
        match res {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.llm_model);

        let mut body = json!({
            "contents": [{"parts": [{"text": request.prompt}]}],
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(system) = &request.system {
                obj.insert(
                    "system_instruction".to_string(),
                    json!({"parts": [{"text": system}]}),
                );
            }

            let mut generation_config = serde_json::Map::new();
            if let Some(t) = request.temperature {
                generation_config.insert("temperature".to_string(), json!(t));
            }
            if request.json_response {
                generation_config
                    .insert("responseMimeType".to_string(), json!("application/json"));
            }
            if !generation_config.is_empty() {
                obj.insert(
                    "generationConfig".to_string(),
                    Value::Object(generation_config),
                );
            }
        }

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Backend(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Self::classify(status, text));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| LlmError::Backend(e.to_string()))?;

        let content = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok(content)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!(
            "{}/models/{}:batchEmbedContents",
            self.base_url, self.embedding_model
        );

        let requests: Vec<Value> = inputs
            .iter()
            .map(|text| {
                json!({
                    "model": format!("models/{}", self.embedding_model),
                    "content": {"parts": [{"text": text}]},
                })
            })
            .collect();

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(|e| LlmError::Backend(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Self::classify(status, text));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| LlmError::Backend(e.to_string()))?;

        let mut embeddings = Vec::new();
        if let Some(data) = payload["embeddings"].as_array() {
            for item in data {
                if let Some(vals) = item["values"].as_array() {
                    let vec: Vec<f32> = vals
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect();
                    embeddings.push(vec);
                }
            }
        }

        if embeddings.len() != inputs.len() {
            return Err(LlmError::Backend(format!(
                "embedding count mismatch: sent {}, received {}",
                inputs.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}
