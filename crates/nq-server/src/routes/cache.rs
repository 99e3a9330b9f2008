//! Cache administration endpoints.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::cache::CacheStats;
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/v1/cache/clear — drop cached interpretations and responses.
pub async fn clear_cache(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let cleared = state.interpreter.clear_cache().await?;
    tracing::info!(cleared, "cache cleared");
    Ok(Json(json!({ "cleared": cleared })))
}

/// GET /api/v1/cache/stats — entry, hit and miss counts.
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.interpreter.cache_stats().await)
}
