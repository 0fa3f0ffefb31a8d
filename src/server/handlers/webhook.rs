//! Mattermost outgoing-webhook entry point.
//!
//! Search and import run detached so the webhook can acknowledge within
//! the platform's response deadline; results are posted back through the
//! incoming webhook when ready.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::parser;
use crate::rag::search::thousands;
use crate::rag::SearchOutcome;
use crate::state::AppState;

const TRIGGER_WORDS: [&str; 2] = ["@見積", "@estimate"];

pub async fn mattermost_webhook(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let text = body["text"].as_str().unwrap_or_default();
    let channel_id = body["channel_id"].as_str().unwrap_or_default().to_string();
    let file_ids: Vec<String> = body["file_ids"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let mut query = text.to_string();
    for trigger in TRIGGER_WORDS {
        query = query.replace(trigger, "");
    }
    let query = query.trim().to_string();

    if query.contains("インポート") && !file_ids.is_empty() {
        tokio::spawn(handle_import(state, channel_id, file_ids));
        return Json(json!({ "text": "📥 取り込み中..." }));
    }

    if query.contains("件数") {
        let text = match state.store.count().await {
            Ok(total) => format!("📊 現在の登録データ件数: {}件", thousands(total as i64)),
            Err(err) => format!("⚠️ 件数の取得に失敗しました: {}", err),
        };
        return Json(json!({ "text": text }));
    }

    tokio::spawn(handle_search(state, channel_id, query));
    Json(json!({ "text": "🔍 検索中..." }))
}

async fn handle_search(state: Arc<AppState>, channel_id: String, query: String) {
    tracing::info!("Search request: {}", query);
    let message = match state
        .search
        .search(&query, state.config.search_limit, None)
        .await
    {
        Ok(outcome) => {
            tracing::info!("Search completed: {} results", outcome.results.len());
            format_search_response(&query, &outcome)
        }
        Err(err) => {
            tracing::error!("Search failed for query {}: {}", query, err);
            format!("⚠️ 検索中にエラーが発生しました: {}", err)
        }
    };

    if let Err(err) = state.mattermost.post_message(&channel_id, &message).await {
        tracing::error!("Failed to post search result: {}", err);
    }
}

async fn handle_import(state: Arc<AppState>, channel_id: String, file_ids: Vec<String>) {
    let message = match import_files(&state, &file_ids).await {
        Ok((new, updated, errors, total)) => {
            tracing::info!(
                "Import complete: new={}, updated={}, errors={}",
                new,
                updated,
                errors.len()
            );
            format_import_response(new, updated, &errors, total)
        }
        Err(err) => {
            tracing::error!("Import failed: {}", err);
            format!("⚠️ 取り込み中にエラーが発生しました: {}", err)
        }
    };

    if let Err(err) = state.mattermost.post_message(&channel_id, &message).await {
        tracing::error!("Failed to post import result: {}", err);
    }
}

async fn import_files(
    state: &AppState,
    file_ids: &[String],
) -> Result<(usize, usize, Vec<String>, usize), ApiError> {
    let mut all_new = 0;
    let mut all_updated = 0;
    let mut all_errors: Vec<String> = Vec::new();

    for file_id in file_ids {
        tracing::info!("Importing file: {}", file_id);
        let (content, filename) = state.mattermost.download_file(file_id).await?;
        let (records, parse_errors) = parser::parse_file(&content, &filename);
        all_errors.extend(parse_errors);

        if !records.is_empty() {
            tracing::info!("Parsed {} records from {}", records.len(), filename);
            let result = state.import.import(&records).await?;
            all_new += result.new_count;
            all_updated += result.updated_count;
            all_errors.extend(result.errors);
        }
    }

    let total = state.store.count().await?;
    Ok((all_new, all_updated, all_errors, total))
}

fn format_search_response(query: &str, outcome: &SearchOutcome) -> String {
    let mut lines = vec!["📋 **見積検索結果**\n".to_string()];
    lines.push(format!("お問い合わせ: {}\n", query));

    if !outcome.results.is_empty() {
        lines.push("**■ 類似案件**".to_string());
        for (i, hit) in outcome.results.iter().enumerate() {
            let name = hit.str_field("name").unwrap_or_default();
            let material = hit.str_field("material").unwrap_or_default();
            let diameter = hit.f64_field("diameter_mm").unwrap_or(0.0);
            let length = hit.f64_field("length_mm").unwrap_or(0.0);
            let application = hit.str_field("application").unwrap_or_default();

            let unit_price = hit.i64_field("unit_price").unwrap_or(0);
            let quantity = hit.i64_field("quantity").unwrap_or(0);
            let price_str = if unit_price != 0 && quantity != 0 {
                format!("単価 {}円 ({}個)", thousands(unit_price), quantity)
            } else {
                format!("{}円", thousands(hit.i64_field("price").unwrap_or(0)))
            };

            lines.push(format!(
                "{}. {} {} Φ{}×{}mm | {} | {}",
                i + 1,
                name,
                material,
                diameter,
                length,
                price_str,
                application
            ));
        }
        lines.push(String::new());
    }

    if !outcome.answer.is_empty() {
        lines.push(format!("**■ 概算目安**\n{}", outcome.answer));
    }

    lines.push("\n⚠️ この金額は過去データに基づく概算です。正式な見積ではありません。".to_string());
    lines.join("\n")
}

fn format_import_response(new: usize, updated: usize, errors: &[String], total: usize) -> String {
    let mut lines = vec!["📥 **データ取り込み完了**\n".to_string()];
    lines.push(format!("新規登録: {}件", new));
    lines.push(format!("更新: {}件", updated));

    if errors.is_empty() {
        lines.push("エラー: 0件".to_string());
    } else {
        lines.push(format!("エラー: {}件", errors.len()));
        for err in errors.iter().take(10) {
            lines.push(format!("  - {}", err));
        }
        if errors.len() > 10 {
            lines.push(format!("  - ... 他{}件", errors.len() - 10));
        }
    }

    lines.push(format!("\n現在の総データ件数: {}件", thousands(total as i64)));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::testing::{hit_for, record};

    #[test]
    fn search_response_lists_hits_and_disclaimer() {
        let outcome = SearchOutcome {
            results: vec![hit_for(&record(1, "シャフト", "SUS304"), 0.9)],
            answer: "概算は1万円前後です。".to_string(),
        };

        let text = format_search_response("SUS304 Φ30", &outcome);
        assert!(text.contains("お問い合わせ: SUS304 Φ30"));
        assert!(text.contains("1. シャフト SUS304 Φ30×200mm | 12,000円 | ポンプ軸"));
        assert!(text.contains("**■ 概算目安**\n概算は1万円前後です。"));
        assert!(text.contains("正式な見積ではありません"));
    }

    #[test]
    fn import_response_truncates_error_list() {
        let errors: Vec<String> = (1..=12).map(|i| format!("行{}: ダミー", i)).collect();
        let text = format_import_response(3, 2, &errors, 120);

        assert!(text.contains("新規登録: 3件"));
        assert!(text.contains("更新: 2件"));
        assert!(text.contains("エラー: 12件"));
        assert!(text.contains("行10: ダミー"));
        assert!(!text.contains("行11: ダミー"));
        assert!(text.contains("... 他2件"));
        assert!(text.contains("現在の総データ件数: 120件"));
    }
}
