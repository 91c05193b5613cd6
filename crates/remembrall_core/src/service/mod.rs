//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the add/peek/clear use-cases.
//! - Keep the CLI decoupled from storage details.

pub mod command_service;
