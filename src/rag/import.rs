//! Batch ingestion of validated estimate records into the vector store.

use std::sync::Arc;

use serde_json::Value;

use super::store::VectorStore;
use crate::core::errors::RagError;
use crate::embedding::EmbeddingClient;
use crate::models::{EstimateRecord, ImportResult};

/// Stateless ingestion pipeline: dedup-check, embed, upsert, recount.
///
/// The new/updated partition reflects a snapshot read before the write;
/// concurrent imports of overlapping ids may each report the same id as
/// new. Counts are consistent per call, not serializable across calls.
#[derive(Clone)]
pub struct ImportPipeline {
    embeddings: EmbeddingClient,
    store: Arc<dyn VectorStore>,
}

impl ImportPipeline {
    pub fn new(embeddings: EmbeddingClient, store: Arc<dyn VectorStore>) -> Self {
        Self { embeddings, store }
    }

    /// Records must already have passed schema validation; row-level
    /// errors belong to the parsing collaborator and are merged into the
    /// result by the caller. Any failure while embedding or persisting
    /// aborts the whole call.
    pub async fn import(&self, records: &[EstimateRecord]) -> Result<ImportResult, RagError> {
        let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        let existing = self.store.existing_ids(&ids).await;
        let updated_count = ids.iter().filter(|id| existing.contains(id)).count();
        let new_count = ids.len() - updated_count;

        let texts: Vec<String> = records.iter().map(|r| r.embedding_text()).collect();
        let vectors = self.embeddings.embed(&texts).await?;

        let payloads: Vec<Value> = records.iter().map(|r| r.payload()).collect();
        self.store.upsert(&ids, &vectors, &payloads).await?;

        let total_count = self.store.count().await?;
        tracing::info!(
            "Imported {} records (new={}, updated={}, total={})",
            records.len(),
            new_count,
            updated_count,
            total_count
        );

        Ok(ImportResult {
            new_count,
            updated_count,
            errors: Vec::new(),
            total_count,
        })
    }
}
