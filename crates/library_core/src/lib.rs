//! Core domain logic for the library catalog.
//! This crate is the single source of truth for the author/book invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{close_db, open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::author::{Author, AuthorId, AuthorUpdate, NewAuthor};
pub use model::book::{validate_isbn, Book, BookId, BookUpdate, NewBook};
pub use model::CatalogValidationError;
pub use repo::catalog_repo::{
    AuthorDeletion, CatalogStore, SqliteCatalogStore, StoreError, StoreResult,
};
pub use service::catalog_service::{
    AuthorDetail, BookDeletion, BookDetail, CatalogService, ErrorKind, ManageOutcome,
    SearchOutcome, ServiceError, ServiceResult,
};
pub use service::forms::{
    AuthorForm, BookForm, BookUpdateForm, InputError, ManageAction, ManageForm,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
