use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Reports degraded when the vector store or the generative backend is
/// unreachable.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let qdrant_ok = state.store.is_healthy().await;
    let llm_ok = state.llm.health_check().await;

    let status = if qdrant_ok && llm_ok { "ok" } else { "degraded" };
    Json(json!({
        "status": status,
        "qdrant": if qdrant_ok { "connected" } else { "disconnected" },
        "llm": if llm_ok { "connected" } else { "disconnected" },
    }))
}
