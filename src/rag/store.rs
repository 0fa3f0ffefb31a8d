//! VectorStore trait — abstract interface for the estimate vector backend.
//!
//! The primary implementation is `QdrantStore` in the `qdrant` module.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use super::filter::SearchFilter;
use crate::core::errors::RagError;

/// One similarity-search result: the stored payload flattened together
/// with the point id and similarity score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: u64,
    pub score: f32,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl SearchHit {
    /// Non-empty string payload field, if present.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn f64_field(&self, key: &str) -> Option<f64> {
        self.payload.get(key).and_then(Value::as_f64)
    }

    pub fn i64_field(&self, key: &str) -> Option<i64> {
        self.payload.get(key).and_then(Value::as_i64)
    }
}

/// Abstract interface over the persistent vector collection.
///
/// All operations are idempotent and safe to call concurrently against
/// the same collection.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if it does not exist; no-op otherwise.
    async fn ensure_collection(&self) -> Result<(), RagError>;

    /// Write parallel (id, vector, payload) triples, replacing points
    /// whose id already exists. Batched internally.
    async fn upsert(
        &self,
        ids: &[u64],
        vectors: &[Vec<f32>],
        payloads: &[Value],
    ) -> Result<(), RagError>;

    /// Nearest neighbors by descending similarity, optionally restricted
    /// to points whose payload satisfies `filter`.
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchHit>, RagError>;

    /// Subset of `ids` already present, via one bulk lookup. Fail-safe:
    /// a backend error yields the empty set so an import proceeds
    /// treating everything as new.
    async fn existing_ids(&self, ids: &[u64]) -> HashSet<u64>;

    /// Total points in the collection.
    async fn count(&self) -> Result<usize, RagError>;

    /// True iff a lightweight metadata call succeeds.
    async fn is_healthy(&self) -> bool;
}
