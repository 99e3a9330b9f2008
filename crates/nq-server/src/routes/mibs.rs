//! MIB module endpoints.

use axum::Json;
use axum::extract::{Path, State};
use nq_mib::{LoadOutcome, ModuleInfo};
use nq_protocol::SchemaEntry;

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/v1/mibs — modules currently loaded, built-ins included.
pub async fn list_modules(State(state): State<AppState>) -> Json<Vec<ModuleInfo>> {
    Json(state.schema.list_loaded_modules())
}

/// POST /api/v1/mibs/{name} — load or reload a module from the repository.
pub async fn load_module(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<LoadOutcome>> {
    let outcome = state.orchestrator.load_module(&name).await?;
    tracing::info!(
        module = %outcome.module,
        entries = outcome.entries,
        changed = outcome.changed,
        "module loaded"
    );
    Ok(Json(outcome))
}

/// GET /api/v1/mibs/{name}/entries — every entry a loaded module defines.
pub async fn module_entries(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<SchemaEntry>>> {
    Ok(Json(state.schema.module_entries(&name)?))
}
