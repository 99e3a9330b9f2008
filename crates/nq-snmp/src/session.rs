//! Session abstraction.
//!
//! `SnmpSession` performs one request/response exchange for whatever binding
//! it is handed. Two impls:
//! - `Snmp2Session` wraps `snmp2::AsyncSession` (in `snmp2_session.rs`)
//! - `MockSession` answers from a scripted `MockAgent` (in `mock.rs`)
//!
//! Sessions are not tied to a target; the pool hands them out per round trip
//! and each exchange carries its binding.

use async_trait::async_trait;
use nq_protocol::RawResult;

use crate::error::TransportError;
use crate::types::{PduRequest, SessionBinding};

/// One reusable protocol session.
#[async_trait]
pub trait SnmpSession: Send {
    /// Send `request` to the bound device and return its bindings in order.
    ///
    /// Timeouts are applied by the caller.
    async fn exchange(
        &mut self,
        binding: &SessionBinding,
        request: &PduRequest,
    ) -> Result<Vec<RawResult>, TransportError>;

    /// Drop transport state after an interrupted exchange so that a late
    /// reply cannot be read by the next request.
    fn reset(&mut self) {}
}

/// Creates fresh sessions when the pool has none idle.
pub trait SessionFactory: Send + Sync {
    fn create(&self) -> Box<dyn SnmpSession>;
}
