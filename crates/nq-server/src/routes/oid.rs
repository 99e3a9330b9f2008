//! Identifier lookup endpoints.

use axum::Json;
use axum::extract::State;
use nq_protocol::Oid;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    /// `sysDescr`, `SNMPv2-MIB::sysDescr`, `ifDescr.3` or dotted-numeric.
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub oid: String,
}

/// Name and identifier of one schema object.
#[derive(Debug, Serialize)]
pub struct IdentifierReply {
    pub name: String,
    pub oid: Oid,
}

/// POST /api/v1/oid/resolve — symbolic name to identifier.
pub async fn resolve_identifier(
    State(state): State<AppState>,
    Json(req): Json<ResolveRequest>,
) -> ApiResult<Json<IdentifierReply>> {
    let oid = state
        .schema
        .resolve_name(req.name.trim())
        .ok_or_else(|| ApiError::NotFound(format!("no loaded object named '{}'", req.name)))?;
    Ok(Json(IdentifierReply {
        name: req.name,
        oid,
    }))
}

/// POST /api/v1/oid/translate — identifier to `MODULE::name[.suffix]`.
pub async fn translate_identifier(
    State(state): State<AppState>,
    Json(req): Json<TranslateRequest>,
) -> ApiResult<Json<IdentifierReply>> {
    let raw = req.oid.trim();
    let oid: Oid = raw
        .strip_prefix('.')
        .unwrap_or(raw)
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let name = state
        .schema
        .translate(&oid)
        .ok_or_else(|| ApiError::NotFound(format!("no loaded object covers {oid}")))?;
    Ok(Json(IdentifierReply { name, oid }))
}
