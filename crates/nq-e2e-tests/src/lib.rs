//! End-to-end tests for NetQuery live under `tests/`.
//!
//! Each scenario drives the real Axum router over simulated devices
//! (`nq_snmp::MockConnector`) and in-memory MIB sources.
