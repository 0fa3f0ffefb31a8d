//! Qdrant-backed vector store over the REST API.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};

use super::filter::SearchFilter;
use super::store::{SearchHit, VectorStore};
use crate::core::config::AppConfig;
use crate::core::errors::RagError;

const UPSERT_BATCH_SIZE: usize = 100;

#[derive(Clone)]
pub struct QdrantStore {
    client: Client,
    base_url: String,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.qdrant_url.trim_end_matches('/').to_string(),
            collection: config.qdrant_collection.clone(),
            dimension: config.embedding_dimension,
        }
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, suffix)
    }

    fn store_err<E: std::fmt::Display>(err: E) -> RagError {
        RagError::VectorStore(err.to_string())
    }

    async fn read_body(res: reqwest::Response) -> Result<Value, RagError> {
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::VectorStore(format!("{}: {}", status, text)));
        }
        res.json().await.map_err(Self::store_err)
    }
}

/// Translates a `SearchFilter` into a Qdrant `must` clause.
fn filter_to_json(filter: &SearchFilter) -> Value {
    let mut must = Vec::new();

    if let Some(material) = &filter.material {
        must.push(json!({"key": "material", "match": {"value": material}}));
    }
    for (key, range) in [
        ("diameter_mm", &filter.diameter_mm),
        ("length_mm", &filter.length_mm),
    ] {
        if let Some(range) = range {
            let mut bounds = Map::new();
            if let Some(min) = range.min {
                bounds.insert("gte".to_string(), json!(min));
            }
            if let Some(max) = range.max {
                bounds.insert("lte".to_string(), json!(max));
            }
            must.push(json!({"key": key, "range": Value::Object(bounds)}));
        }
    }

    json!({ "must": must })
}

fn hit_from_point(point: &Value) -> Option<SearchHit> {
    let id = point.get("id")?.as_u64()?;
    let score = point.get("score")?.as_f64()? as f32;
    let payload = point
        .get("payload")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    Some(SearchHit { id, score, payload })
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self) -> Result<(), RagError> {
        let url = format!("{}/collections", self.base_url);
        let res = self.client.get(&url).send().await.map_err(Self::store_err)?;
        let body = Self::read_body(res).await?;

        let exists = body["result"]["collections"]
            .as_array()
            .map(|collections| {
                collections
                    .iter()
                    .any(|c| c["name"].as_str() == Some(self.collection.as_str()))
            })
            .unwrap_or(false);

        if exists {
            return Ok(());
        }

        tracing::info!("Creating collection {}", self.collection);
        let res = self
            .client
            .put(self.collection_url(""))
            .json(&json!({
                "vectors": {"size": self.dimension, "distance": "Cosine"},
            }))
            .send()
            .await
            .map_err(Self::store_err)?;
        Self::read_body(res).await?;

        Ok(())
    }

    async fn upsert(
        &self,
        ids: &[u64],
        vectors: &[Vec<f32>],
        payloads: &[Value],
    ) -> Result<(), RagError> {
        for offset in (0..ids.len()).step_by(UPSERT_BATCH_SIZE) {
            let end = (offset + UPSERT_BATCH_SIZE).min(ids.len());
            let points: Vec<Value> = (offset..end)
                .map(|i| {
                    json!({
                        "id": ids[i],
                        "vector": vectors[i],
                        "payload": payloads[i],
                    })
                })
                .collect();

            let res = self
                .client
                .put(self.collection_url("/points?wait=true"))
                .json(&json!({ "points": points }))
                .send()
                .await
                .map_err(Self::store_err)?;
            Self::read_body(res).await?;
        }

        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchHit>, RagError> {
        let mut body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(filter) = filter {
            body["filter"] = filter_to_json(filter);
        }

        let res = self
            .client
            .post(self.collection_url("/points/query"))
            .json(&body)
            .send()
            .await
            .map_err(Self::store_err)?;
        let payload = Self::read_body(res).await?;

        let hits = payload["result"]["points"]
            .as_array()
            .map(|points| points.iter().filter_map(hit_from_point).collect())
            .unwrap_or_default();

        Ok(hits)
    }

    async fn existing_ids(&self, ids: &[u64]) -> HashSet<u64> {
        let request = self
            .client
            .post(self.collection_url("/points"))
            .json(&json!({
                "ids": ids,
                "with_payload": false,
                "with_vector": false,
            }))
            .send()
            .await;

        let body = match request {
            Ok(res) => Self::read_body(res).await,
            Err(err) => Err(Self::store_err(err)),
        };

        match body {
            Ok(body) => body["result"]
                .as_array()
                .map(|points| {
                    points
                        .iter()
                        .filter_map(|p| p["id"].as_u64())
                        .collect::<HashSet<_>>()
                })
                .unwrap_or_default(),
            Err(err) => {
                tracing::warn!("Existing-id lookup failed, treating all as new: {}", err);
                HashSet::new()
            }
        }
    }

    async fn count(&self) -> Result<usize, RagError> {
        let res = self
            .client
            .get(self.collection_url(""))
            .send()
            .await
            .map_err(Self::store_err)?;
        let body = Self::read_body(res).await?;

        Ok(body["result"]["points_count"].as_u64().unwrap_or(0) as usize)
    }

    async fn is_healthy(&self) -> bool {
        let url = format!("{}/collections", self.base_url);
        match self.client.get(&url).send().await {
            Ok(res) => res.status().is_success(),
            Err(_) => false,
        }
    }
}
