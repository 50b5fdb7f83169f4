//! Catalog persistence.
//!
//! # Responsibility
//! - Define the `CatalogStore` contract consumed by the service layer.
//! - Keep SQLite query details behind that contract.
//!
//! # Invariants
//! - Store writes validate entities before any SQL mutation.
//! - Missing rows surface as semantic `*NotFound` errors, not empty results,
//!   on every mutating path.

pub mod catalog_repo;
