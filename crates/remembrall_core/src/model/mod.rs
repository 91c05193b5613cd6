//! Domain model for remembered notes and parsed commands.
//!
//! # Responsibility
//! - Define the `Memory` record persisted by the store.
//! - Define the `Command` value produced by argument parsing.
//!
//! # Invariants
//! - Field length limits live here and are shared by executor and store.

pub mod command;
pub mod memory;
