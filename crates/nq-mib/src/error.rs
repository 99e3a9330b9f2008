//! Schema repository error types.

use nq_protocol::ErrorKind;
use thiserror::Error;

/// Errors that can occur while loading MIB modules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("MIB module not found: {0}")]
    NotFound(String),

    #[error("{module}: parse error on line {line}: {message}")]
    Parse {
        module: String,
        line: usize,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(String),
}

impl SchemaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchemaError::NotFound(_) | SchemaError::Io(_) => ErrorKind::NotFound,
            SchemaError::Parse { .. } => ErrorKind::Parse,
        }
    }
}

/// Convenience alias for schema results.
pub type SchemaResult<T> = Result<T, SchemaError>;
