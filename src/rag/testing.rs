//! Shared in-memory store and fixtures for pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::filter::SearchFilter;
use super::store::{SearchHit, VectorStore};
use crate::core::errors::RagError;
use crate::models::EstimateRecord;

/// Stateful mock: `upsert`/`existing_ids`/`count` behave like a real
/// collection over an id→payload map, while `search` replays canned hit
/// lists depending on whether a filter was applied.
#[derive(Default)]
pub struct MockStore {
    pub filtered_hits: Mutex<Vec<SearchHit>>,
    pub unfiltered_hits: Mutex<Vec<SearchHit>>,
    pub points: Mutex<HashMap<u64, Value>>,
    pub searches: Mutex<Vec<(Option<SearchFilter>, usize)>>,
    pub upserted_ids: Mutex<Vec<Vec<u64>>>,
}

impl MockStore {
    pub fn with_hits(filtered: Vec<SearchHit>, unfiltered: Vec<SearchHit>) -> Self {
        Self {
            filtered_hits: Mutex::new(filtered),
            unfiltered_hits: Mutex::new(unfiltered),
            ..Self::default()
        }
    }

    pub fn seed_point(&self, id: u64) {
        self.points.lock().unwrap().insert(id, Value::Null);
    }

    pub fn search_count(&self) -> usize {
        self.searches.lock().unwrap().len()
    }
}

#[async_trait]
impl VectorStore for MockStore {
    async fn ensure_collection(&self) -> Result<(), RagError> {
        Ok(())
    }

    async fn upsert(
        &self,
        ids: &[u64],
        _vectors: &[Vec<f32>],
        payloads: &[Value],
    ) -> Result<(), RagError> {
        self.upserted_ids.lock().unwrap().push(ids.to_vec());
        let mut points = self.points.lock().unwrap();
        for (id, payload) in ids.iter().zip(payloads) {
            points.insert(*id, payload.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        _vector: &[f32],
        limit: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SearchHit>, RagError> {
        self.searches
            .lock()
            .unwrap()
            .push((filter.cloned(), limit));

        let hits = if filter.is_some() {
            self.filtered_hits.lock().unwrap().clone()
        } else {
            self.unfiltered_hits.lock().unwrap().clone()
        };
        Ok(hits.into_iter().take(limit).collect())
    }

    async fn existing_ids(&self, ids: &[u64]) -> HashSet<u64> {
        let points = self.points.lock().unwrap();
        ids.iter().copied().filter(|id| points.contains_key(id)).collect()
    }

    async fn count(&self) -> Result<usize, RagError> {
        Ok(self.points.lock().unwrap().len())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

pub fn record(id: u64, name: &str, material: &str) -> EstimateRecord {
    EstimateRecord {
        id,
        name: name.to_string(),
        material: material.to_string(),
        diameter_mm: 30.0,
        length_mm: 200.0,
        weight_kg: None,
        application: "ポンプ軸".to_string(),
        grade: None,
        price: 12000,
        quantity: None,
        unit_price: None,
        customer: None,
        notes: None,
        estimate_date: None,
    }
}

/// A hit as the store would return it for `record`.
pub fn hit_for(record: &EstimateRecord, score: f32) -> SearchHit {
    let payload = record
        .payload()
        .as_object()
        .cloned()
        .unwrap_or_default();
    SearchHit {
        id: record.id,
        score,
        payload,
    }
}
