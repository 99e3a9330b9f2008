//! NetQuery API server: library crate.
//!
//! Re-exports all modules so the binary (`main.rs`) and external crates
//! (e.g. `nq-e2e-tests`) can build an `AppState` from their own
//! collaborators and drive the real router.

pub mod cache;
pub mod config;
pub mod error;
pub mod inference;
pub mod interpreter;
pub mod orchestrator;
pub mod routes;
pub mod state;
