//! Debug and administration endpoints over the pipeline.

use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::parser;
use crate::rag::SearchOutcome;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: String,
    limit: Option<usize>,
    /// Overrides any LLM-extracted material condition.
    material: Option<String>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchOutcome>, ApiError> {
    let limit = params.limit.unwrap_or(state.config.search_limit);
    let outcome = state
        .search
        .search(&params.q, limit, params.material.as_deref())
        .await?;
    Ok(Json(outcome))
}

pub async fn count(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let count = state.store.count().await?;
    Ok(Json(json!({ "count": count })))
}

/// Direct CSV upload, mainly for debugging the ingestion path.
pub async fn import_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut upload: Option<(Vec<u8>, String)> = None;
    while let Some(field) = multipart.next_field().await.map_err(ApiError::internal)? {
        if let Some(filename) = field.file_name().map(str::to_string) {
            let content = field.bytes().await.map_err(ApiError::internal)?;
            upload = Some((content.to_vec(), filename));
            break;
        }
    }

    let (content, filename) =
        upload.ok_or_else(|| ApiError::BadRequest("file part missing".to_string()))?;

    let (records, parse_errors) = parser::parse_file(&content, &filename);
    if records.is_empty() && !parse_errors.is_empty() {
        return Ok(Json(json!({ "status": "error", "errors": parse_errors })));
    }

    let result = state.import.import(&records).await?;
    let mut errors = parse_errors;
    errors.extend(result.errors);

    Ok(Json(json!({
        "status": "ok",
        "new_count": result.new_count,
        "updated_count": result.updated_count,
        "errors": errors,
        "total_count": result.total_count,
    })))
}
