//! Answer generation over retrieved estimate context.

use std::sync::Arc;

use crate::core::errors::RagError;
use crate::llm::{GenerateRequest, LlmProvider};

const SYSTEM_PROMPT: &str = "\
あなたは金属加工部品の見積もりを支援するアシスタントです。
過去の見積データの検索結果を参考に、問い合わせに近い案件と概算価格の目安を
日本語で簡潔に説明してください。検索結果に含まれない情報を推測で補わないでください。
金額は過去実績に基づく参考値であることを必ず明記してください。";

/// Turns (query, retrieved context) into a narrative answer.
///
/// No retry: a failure here is fatal to the enclosing search call.
#[derive(Clone)]
pub struct AnswerGenerator {
    backend: Arc<dyn LlmProvider>,
}

impl AnswerGenerator {
    pub fn new(backend: Arc<dyn LlmProvider>) -> Self {
        Self { backend }
    }

    pub async fn generate(&self, query: &str, context: &str) -> Result<String, RagError> {
        let prompt = format!(
            "[検索結果]\n以下は過去の見積データから類似する案件を検索した結果です:\n\n{}\n\n[ユーザーの質問]\n{}",
            context, query
        );

        self.backend
            .generate(GenerateRequest::new(prompt).with_system(SYSTEM_PROMPT))
            .await
            .map_err(|err| RagError::AnswerGeneration(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::MockLlm;
    use crate::llm::LlmError;

    #[tokio::test]
    async fn prompt_embeds_context_and_query() {
        let llm = Arc::new(MockLlm::default());
        llm.queue_generate(Ok("概算は1万円前後です。".to_string()));
        let generator = AnswerGenerator::new(llm.clone());

        let answer = generator
            .generate("SUS304のシャフトはいくら？", "1. シャフト SUS304")
            .await
            .unwrap();
        assert_eq!(answer, "概算は1万円前後です。");

        let calls = llm.generate_calls.lock().unwrap();
        assert!(calls[0].prompt.contains("1. シャフト SUS304"));
        assert!(calls[0].prompt.contains("SUS304のシャフトはいくら？"));
        assert!(calls[0].system.is_some());
    }

    #[tokio::test]
    async fn backend_failure_is_fatal() {
        let llm = Arc::new(MockLlm::default());
        llm.queue_generate(Err(LlmError::Backend("down".to_string())));
        let generator = AnswerGenerator::new(llm);

        let err = generator.generate("q", "c").await.unwrap_err();
        assert!(matches!(err, RagError::AnswerGeneration(_)));
    }
}
