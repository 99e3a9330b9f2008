//! Natural-language query endpoint.

use axum::Json;
use axum::extract::State;
use nq_protocol::Response;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::orchestrator::ProcessOptions;
use crate::state::AppState;

/// Request body for a query.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Natural-language request text.
    pub query: String,
    /// Bypass the cache for this request.
    #[serde(default)]
    pub skip_cache: bool,
}

/// Annotated results, echoed with the request text.
#[derive(Debug, Serialize)]
pub struct QueryReply {
    pub query: String,
    #[serde(flatten)]
    pub response: Response,
}

/// POST /api/v1/query — interpret, execute, and annotate a request.
pub async fn process_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> ApiResult<Json<QueryReply>> {
    if req.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query text is empty".into()));
    }

    let options = ProcessOptions {
        skip_cache: req.skip_cache,
    };
    let response = state.orchestrator.process_with(&req.query, options).await?;
    Ok(Json(QueryReply {
        query: req.query,
        response,
    }))
}
