//! Repository layer: transactional façade over the entity store and ledger.
//!
//! # Responsibility
//! - Own the right to mutate persisted state.
//! - Pair every synced entity write with its ledger entry atomically.
//!
//! # Invariants
//! - Transaction scope is an explicit `WriteTx` value, never ambient.
//! - Repository APIs return semantic errors (`NotFound`, `Validation`) in
//!   addition to storage errors.

pub mod repository;

pub use repository::{Repository, WriteTx, LOCAL_SOURCE_ID_OPTION};
