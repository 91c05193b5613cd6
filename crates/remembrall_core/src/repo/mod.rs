//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the memory storage contract used by the command executor.
//! - Isolate SQLite query details from command orchestration.
//!
//! # Invariants
//! - Repository writes enforce field length limits before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to SQLite
//!   prepare/execute/transaction errors.

pub mod memory_repo;
