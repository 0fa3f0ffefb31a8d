//! Query-answering orchestration: embed, filter, search, answer.

use std::sync::Arc;

use serde::Serialize;

use super::answer::AnswerGenerator;
use super::filter::{FilterExtractor, SearchFilter};
use super::store::{SearchHit, VectorStore};
use crate::core::errors::RagError;
use crate::embedding::EmbeddingClient;

const NO_MATCH_ANSWER: &str = "該当するデータが見つかりませんでした。";

/// When a filtered search returns fewer hits than this, the filter is
/// assumed over-constrained and the search is re-run unfiltered.
const FALLBACK_THRESHOLD: usize = 2;

#[derive(Debug, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchHit>,
    pub answer: String,
}

/// Stateless composition of the embedding client, filter extractor,
/// vector store and answer generator into one query-answering operation.
#[derive(Clone)]
pub struct SearchOrchestrator {
    embeddings: EmbeddingClient,
    filters: FilterExtractor,
    store: Arc<dyn VectorStore>,
    answers: AnswerGenerator,
}

impl SearchOrchestrator {
    pub fn new(
        embeddings: EmbeddingClient,
        filters: FilterExtractor,
        store: Arc<dyn VectorStore>,
        answers: AnswerGenerator,
    ) -> Self {
        Self {
            embeddings,
            filters,
            store,
            answers,
        }
    }

    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        material_override: Option<&str>,
    ) -> Result<SearchOutcome, RagError> {
        let query_vector = self.embeddings.embed_one(query).await?;

        let extracted = self.filters.extract(query).await;
        let filter = merge_material_override(extracted, material_override);
        tracing::info!("Extracted filter: {:?}", filter);

        let mut results = self
            .store
            .search(&query_vector, limit, filter.as_ref())
            .await?;

        if results.len() < FALLBACK_THRESHOLD && filter.is_some() {
            tracing::info!("Too few results with filter, retrying without filter");
            results = self.store.search(&query_vector, limit, None).await?;
        }

        if results.is_empty() {
            return Ok(SearchOutcome {
                results,
                answer: NO_MATCH_ANSWER.to_string(),
            });
        }

        let context = build_context(&results);
        let answer = self.answers.generate(query, &context).await?;

        Ok(SearchOutcome { results, answer })
    }
}

/// The caller-supplied material always wins over the extracted one; a
/// bare override becomes a material-only filter.
fn merge_material_override(
    extracted: Option<SearchFilter>,
    material_override: Option<&str>,
) -> Option<SearchFilter> {
    match (extracted, material_override) {
        (Some(mut filter), Some(material)) => {
            filter.material = Some(material.to_string());
            Some(filter)
        }
        (None, Some(material)) => Some(SearchFilter::material_only(material)),
        (extracted, None) => extracted,
    }
}

/// One numbered line per hit, in the store's similarity order.
fn build_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("{}. {}", i + 1, context_line(hit)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn context_line(hit: &SearchHit) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(name) = hit.str_field("name") {
        parts.push(name.to_string());
    }
    if let Some(material) = hit.str_field("material") {
        parts.push(material.to_string());
    }
    parts.push(format!(
        "Φ{}×{}mm",
        hit.f64_field("diameter_mm").unwrap_or(0.0),
        hit.f64_field("length_mm").unwrap_or(0.0)
    ));
    if let Some(weight) = hit.f64_field("weight_kg").filter(|w| *w != 0.0) {
        parts.push(format!("{}kg", weight));
    }
    if let Some(application) = hit.str_field("application") {
        parts.push(application.to_string());
    }
    if let Some(grade) = hit.str_field("grade") {
        parts.push(grade.to_string());
    }

    let unit_price = hit.i64_field("unit_price").unwrap_or(0);
    let quantity = hit.i64_field("quantity").unwrap_or(0);
    let price = hit.i64_field("price").unwrap_or(0);
    if unit_price != 0 && quantity != 0 {
        parts.push(format!("単価{}円 ({}個)", thousands(unit_price), quantity));
    } else if price != 0 {
        parts.push(format!("{}円", thousands(price)));
    }

    if let Some(notes) = hit.str_field("notes") {
        parts.push(notes.to_string());
    }

    parts.join(" ")
}

/// Comma-grouped decimal rendering, e.g. 1234567 → "1,234,567".
pub(crate) fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if n < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::MockLlm;
    use crate::rag::filter::RangeCondition;
    use crate::rag::testing::{hit_for, record, MockStore};

    struct Harness {
        orchestrator: SearchOrchestrator,
        store: Arc<MockStore>,
        filter_llm: Arc<MockLlm>,
        answer_llm: Arc<MockLlm>,
    }

    fn harness(store: MockStore) -> Harness {
        let store = Arc::new(store);
        let filter_llm = Arc::new(MockLlm::default());
        let answer_llm = Arc::new(MockLlm::default());
        let orchestrator = SearchOrchestrator::new(
            EmbeddingClient::new(Arc::new(MockLlm::default()), 100),
            FilterExtractor::new(filter_llm.clone()),
            store.clone(),
            AnswerGenerator::new(answer_llm.clone()),
        );
        Harness {
            orchestrator,
            store,
            filter_llm,
            answer_llm,
        }
    }

    fn hits(n: usize) -> Vec<SearchHit> {
        (0..n)
            .map(|i| hit_for(&record(i as u64 + 1, &format!("部品{}", i + 1), "SUS304"), 0.9))
            .collect()
    }

    const SUS304_FILTER: &str =
        r#"{"material": "SUS304", "diameter_min": 24.0, "diameter_max": 36.0}"#;

    #[tokio::test]
    async fn filtered_search_with_enough_hits_skips_fallback() {
        let h = harness(MockStore::with_hits(hits(3), hits(5)));
        h.filter_llm.queue_generate(Ok(SUS304_FILTER.to_string()));
        h.answer_llm.queue_generate(Ok("概算です".to_string()));

        let outcome = h
            .orchestrator
            .search("SUS304 Φ30 くらい", 5, None)
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.answer, "概算です");

        let searches = h.store.searches.lock().unwrap();
        assert_eq!(searches.len(), 1);
        let (filter, limit) = &searches[0];
        let filter = filter.as_ref().unwrap();
        assert_eq!(filter.material.as_deref(), Some("SUS304"));
        assert_eq!(
            filter.diameter_mm,
            Some(RangeCondition {
                min: Some(24.0),
                max: Some(36.0)
            })
        );
        assert_eq!(*limit, 5);

        // Context carries the hits in ranking order, answer generated once.
        assert_eq!(h.answer_llm.generate_call_count(), 1);
        let calls = h.answer_llm.generate_calls.lock().unwrap();
        assert!(calls[0].prompt.contains("1. 部品1"));
        assert!(calls[0].prompt.contains("2. 部品2"));
        assert!(calls[0].prompt.contains("3. 部品3"));
    }

    #[tokio::test]
    async fn too_few_filtered_hits_fall_back_to_unfiltered() {
        let h = harness(MockStore::with_hits(hits(1), hits(4)));
        h.filter_llm.queue_generate(Ok(SUS304_FILTER.to_string()));

        let outcome = h.orchestrator.search("SUS304 Φ30", 5, None).await.unwrap();

        assert_eq!(outcome.results.len(), 4);
        let searches = h.store.searches.lock().unwrap();
        assert_eq!(searches.len(), 2);
        assert!(searches[0].0.is_some());
        assert!(searches[1].0.is_none());
        assert_eq!(searches[1].1, 5);
    }

    #[tokio::test]
    async fn no_filter_means_no_fallback_even_with_zero_hits() {
        let h = harness(MockStore::with_hits(hits(0), hits(0)));
        // Extraction yields nothing usable.
        h.filter_llm.queue_generate(Ok("{}".to_string()));

        let outcome = h.orchestrator.search("何かある？", 5, None).await.unwrap();

        assert!(outcome.results.is_empty());
        assert_eq!(h.store.search_count(), 1);
        assert!(h.store.searches.lock().unwrap()[0].0.is_none());
        // Short-circuit: fixed answer, no generation call.
        assert_eq!(outcome.answer, NO_MATCH_ANSWER);
        assert_eq!(h.answer_llm.generate_call_count(), 0);
    }

    #[tokio::test]
    async fn empty_results_after_fallback_short_circuit() {
        let h = harness(MockStore::with_hits(hits(0), hits(0)));
        h.filter_llm.queue_generate(Ok(SUS304_FILTER.to_string()));

        let outcome = h.orchestrator.search("SUS304", 5, None).await.unwrap();

        assert_eq!(h.store.search_count(), 2);
        assert_eq!(outcome.answer, NO_MATCH_ANSWER);
        assert_eq!(h.answer_llm.generate_call_count(), 0);
    }

    #[tokio::test]
    async fn material_override_replaces_extracted_material() {
        let h = harness(MockStore::with_hits(hits(2), hits(2)));
        h.filter_llm.queue_generate(Ok(SUS304_FILTER.to_string()));

        h.orchestrator
            .search("SUS304 Φ30", 5, Some("S45C"))
            .await
            .unwrap();

        let searches = h.store.searches.lock().unwrap();
        let filter = searches[0].0.as_ref().unwrap();
        assert_eq!(filter.material.as_deref(), Some("S45C"));
        // Extracted range survives the override.
        assert!(filter.diameter_mm.is_some());
    }

    #[tokio::test]
    async fn material_override_without_extracted_filter_builds_one() {
        let h = harness(MockStore::with_hits(hits(2), hits(2)));
        h.filter_llm.queue_generate(Ok("{}".to_string()));

        h.orchestrator
            .search("適当な部品", 5, Some("S45C"))
            .await
            .unwrap();

        let searches = h.store.searches.lock().unwrap();
        let filter = searches[0].0.as_ref().unwrap();
        assert_eq!(filter, &SearchFilter::material_only("S45C"));
    }

    #[tokio::test]
    async fn context_price_clause_prefers_unit_price_with_quantity() {
        let mut with_unit = record(1, "シャフト", "SUS304");
        with_unit.unit_price = Some(1500);
        with_unit.quantity = Some(10);
        let mut flat = record(2, "ブッシュ", "S45C");
        flat.price = 98000;
        let mut priceless = record(3, "カラー", "A5056");
        priceless.price = 0;

        let context = build_context(&[
            hit_for(&with_unit, 0.9),
            hit_for(&flat, 0.8),
            hit_for(&priceless, 0.7),
        ]);

        let lines: Vec<&str> = context.lines().collect();
        assert!(lines[0].contains("単価1,500円 (10個)"));
        assert!(lines[1].contains("98,000円"));
        assert!(!lines[2].contains("円"));
    }

    #[test]
    fn thousands_groups_digits() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1500), "1,500");
        assert_eq!(thousands(1234567), "1,234,567");
        assert_eq!(thousands(-98000), "-98,000");
    }
}
