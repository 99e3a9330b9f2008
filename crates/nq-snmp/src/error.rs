//! Device client error types.

use std::time::Duration;

use nq_protocol::{ErrorKind, Oid};
use thiserror::Error;

/// Failure of a single exchange with a device, before retry policy applies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("no reply within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("device unreachable: {0}")]
    Unreachable(String),

    #[error("malformed reply: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Timeouts and socket failures are retried; malformed replies are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Timeout(_) | TransportError::Unreachable(_))
    }
}

/// Errors surfaced by [`DeviceClient`](crate::DeviceClient) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("{target}: no response after {attempts} attempt(s): {reason}")]
    Connect {
        target: String,
        attempts: u32,
        reason: String,
    },

    #[error("{target}: protocol error: {message}")]
    Protocol { target: String, message: String },

    #[error("{target}: requested {requested} binding(s), received {received}")]
    PartialResponse {
        target: String,
        requested: usize,
        received: usize,
    },

    #[error("{target}: walk went backwards from {previous} to {returned}")]
    WalkBoundary {
        target: String,
        previous: Oid,
        returned: Oid,
    },
}

impl DeviceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeviceError::Connect { .. } => ErrorKind::Connect,
            DeviceError::Protocol { .. } => ErrorKind::Protocol,
            DeviceError::PartialResponse { .. } => ErrorKind::PartialResponse,
            DeviceError::WalkBoundary { .. } => ErrorKind::WalkBoundary,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            DeviceError::Connect { target, .. }
            | DeviceError::Protocol { target, .. }
            | DeviceError::PartialResponse { target, .. }
            | DeviceError::WalkBoundary { target, .. } => target,
        }
    }
}

/// Convenience alias for device client results.
pub type DeviceResult<T> = Result<T, DeviceError>;
