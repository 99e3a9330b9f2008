//! Unified API error type with Axum `IntoResponse` support.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nq_mib::SchemaError;
use nq_protocol::ErrorKind;
use serde_json::json;

use crate::cache::CacheError;
use crate::orchestrator::ProcessError;

/// API error type that converts to proper HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A domain failure, mapped to a status by its kind.
    #[error("{message}")]
    Domain { kind: ErrorKind, message: String },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain { kind, .. } => status_for(*kind),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind_str(&self) -> &'static str {
        match self {
            ApiError::Domain { kind, .. } => kind.as_str(),
            ApiError::BadRequest(_) => ErrorKind::Validation.as_str(),
            ApiError::NotFound(_) => ErrorKind::NotFound.as_str(),
            ApiError::Internal(_) => "internal",
        }
    }
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::Interpretation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Parse => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Connect => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Protocol | ErrorKind::PartialResponse | ErrorKind::WalkBoundary => {
            StatusCode::BAD_GATEWAY
        }
        ErrorKind::Cache => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl From<ProcessError> for ApiError {
    fn from(err: ProcessError) -> Self {
        ApiError::Domain {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<SchemaError> for ApiError {
    fn from(err: SchemaError) -> Self {
        ApiError::Domain {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        ApiError::Domain {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "error": self.to_string(),
            "kind": self.kind_str(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience alias.
pub type ApiResult<T> = Result<T, ApiError>;
