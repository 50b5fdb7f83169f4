//! Catalog use-case services.
//!
//! # Responsibility
//! - Turn raw form input into typed, validated catalog mutations.
//! - Keep callers (CLI, an HTTP layer) decoupled from storage details.

pub mod catalog_service;
pub mod forms;
