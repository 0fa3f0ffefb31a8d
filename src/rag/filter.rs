//! LLM-backed extraction of structured search conditions from free text.

use std::sync::Arc;

use serde::Deserialize;

use crate::llm::{GenerateRequest, LlmProvider};

/// Inclusive numeric range; either bound may be open.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeCondition {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Conjunction of search conditions over the estimate payload.
///
/// A filter with no conditions must not exist — constructors return
/// `None` instead, so `Some(filter)` always constrains the search.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchFilter {
    pub material: Option<String>,
    pub diameter_mm: Option<RangeCondition>,
    pub length_mm: Option<RangeCondition>,
}

impl SearchFilter {
    pub fn material_only(material: &str) -> Self {
        Self {
            material: Some(material.to_string()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.material.is_none() && self.diameter_mm.is_none() && self.length_mm.is_none()
    }
}

const EXTRACTION_PROMPT: &str = "\
ユーザーの問い合わせから、以下の検索条件を抽出してJSON形式で返してください。
該当しないフィールドはnullにしてください。

抽出対象:
- material: 材質（例: \"SUS304\", \"S45C\"）。完全一致用。
- diameter_min: 外径の下限 (mm)。数値のみ。
- diameter_max: 外径の上限 (mm)。数値のみ。
- length_min: 長さの下限 (mm)。数値のみ。
- length_max: 長さの上限 (mm)。数値のみ。

「Φ30くらい」のような曖昧な表現は ±20% の範囲に変換してください（例: 24〜36）。
「Φ50×200」のような正確な値はmin/maxを同じ値にしてください。

JSON以外のテキストは出力しないでください。

ユーザーの問い合わせ:
";

#[derive(Debug, Default, Deserialize)]
struct RawConditions {
    material: Option<String>,
    diameter_min: Option<f64>,
    diameter_max: Option<f64>,
    length_min: Option<f64>,
    length_max: Option<f64>,
}

/// Extracts an optional `SearchFilter` from a free-text query.
///
/// Extraction is advisory: a backend failure, malformed output, or an
/// answer with no usable field all collapse to `None` and the search
/// proceeds unfiltered.
#[derive(Clone)]
pub struct FilterExtractor {
    backend: Arc<dyn LlmProvider>,
}

impl FilterExtractor {
    pub fn new(backend: Arc<dyn LlmProvider>) -> Self {
        Self { backend }
    }

    pub async fn extract(&self, query: &str) -> Option<SearchFilter> {
        let request = GenerateRequest::new(format!("{}{}", EXTRACTION_PROMPT, query))
            .with_temperature(0.0)
            .json();

        let raw = match self.backend.generate(request).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!("Filter extraction call failed: {}", err);
                return None;
            }
        };

        let parsed: RawConditions = match serde_json::from_str(raw.trim()) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!("Filter extraction returned non-JSON output: {}", err);
                return None;
            }
        };

        Self::build(parsed)
    }

    fn build(raw: RawConditions) -> Option<SearchFilter> {
        let mut filter = SearchFilter::default();

        if let Some(material) = raw.material.filter(|m| !m.trim().is_empty()) {
            filter.material = Some(material);
        }
        if raw.diameter_min.is_some() || raw.diameter_max.is_some() {
            filter.diameter_mm = Some(RangeCondition {
                min: raw.diameter_min,
                max: raw.diameter_max,
            });
        }
        if raw.length_min.is_some() || raw.length_max.is_some() {
            filter.length_mm = Some(RangeCondition {
                min: raw.length_min,
                max: raw.length_max,
            });
        }

        if filter.is_empty() {
            None
        } else {
            Some(filter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::MockLlm;
    use crate::llm::LlmError;

    fn extractor() -> (FilterExtractor, Arc<MockLlm>) {
        let llm = Arc::new(MockLlm::default());
        (FilterExtractor::new(llm.clone()), llm)
    }

    #[tokio::test]
    async fn parses_all_conditions() {
        let (extractor, llm) = extractor();
        llm.queue_generate(Ok(r#"{
            "material": "SUS304",
            "diameter_min": 24.0, "diameter_max": 36.0,
            "length_min": 200.0, "length_max": 200.0
        }"#
        .to_string()));

        let filter = extractor.extract("SUS304 Φ30くらい 長さ200").await.unwrap();
        assert_eq!(filter.material.as_deref(), Some("SUS304"));
        assert_eq!(
            filter.diameter_mm,
            Some(RangeCondition {
                min: Some(24.0),
                max: Some(36.0)
            })
        );
        assert_eq!(
            filter.length_mm,
            Some(RangeCondition {
                min: Some(200.0),
                max: Some(200.0)
            })
        );
    }

    #[tokio::test]
    async fn open_bound_is_preserved() {
        let (extractor, llm) = extractor();
        llm.queue_generate(Ok(
            r#"{"material": null, "diameter_min": 50.0, "diameter_max": null}"#.to_string(),
        ));

        let filter = extractor.extract("Φ50以上").await.unwrap();
        assert_eq!(
            filter.diameter_mm,
            Some(RangeCondition {
                min: Some(50.0),
                max: None
            })
        );
        assert!(filter.material.is_none());
        assert!(filter.length_mm.is_none());
    }

    #[tokio::test]
    async fn all_null_fields_mean_no_filter() {
        let (extractor, llm) = extractor();
        llm.queue_generate(Ok(r#"{"material": null}"#.to_string()));
        assert!(extractor.extract("いくらくらい？").await.is_none());
    }

    #[tokio::test]
    async fn backend_failure_fails_open() {
        let (extractor, llm) = extractor();
        llm.queue_generate(Err(LlmError::Backend("unreachable".to_string())));
        assert!(extractor.extract("SUS304の見積").await.is_none());
    }

    #[tokio::test]
    async fn malformed_output_fails_open() {
        let (extractor, llm) = extractor();
        llm.queue_generate(Ok("すみません、わかりません".to_string()));
        assert!(extractor.extract("SUS304の見積").await.is_none());
    }

    #[tokio::test]
    async fn request_is_deterministic_json_mode() {
        let (extractor, llm) = extractor();
        llm.queue_generate(Ok(r#"{"material": "S45C"}"#.to_string()));
        let _ = extractor.extract("S45Cで").await;

        let calls = llm.generate_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.ends_with("S45Cで"));
        assert_eq!(calls[0].temperature, Some(0.0));
        assert!(calls[0].json_response);
    }
}
