//! Catalog use-case service.
//!
//! # Responsibility
//! - Entry points for the add/list/search/rate/update/delete/manage flows.
//! - Parse raw forms into typed drafts before they reach the store.
//! - Own the reverse cascade: removing an author's last book removes the author.
//!
//! # Invariants
//! - Every mutation runs inside one store transaction; a failed call leaves
//!   the catalog unchanged.
//! - Author → books cascade is left to the store. Book → author reverse
//!   cascade happens only in [`CatalogService::delete_book_cascading`].

use crate::model::author::{Author, AuthorId, AuthorUpdate};
use crate::model::book::{Book, BookId, BookUpdate};
use crate::model::CatalogValidationError;
use crate::repo::catalog_repo::{AuthorDeletion, CatalogStore, StoreError};
use crate::service::forms::{
    parse_required, AuthorForm, BookForm, InputError, ManageAction, ManageForm,
};
use log::{error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Coarse error class, for mapping to a response (form re-display, 404, 409).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Internal,
}

/// Service error for catalog use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// A raw form field could not be parsed.
    InvalidInput(InputError),
    /// Parsed input breaks an entity rule.
    Validation(CatalogValidationError),
    AuthorNotFound(AuthorId),
    BookNotFound(BookId),
    DuplicateIsbn(String),
    /// Persistence-layer failure.
    Store(StoreError),
    /// Write succeeded but read-back did not find the row.
    InconsistentState(&'static str),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::Validation(_) => ErrorKind::Validation,
            Self::AuthorNotFound(_) | Self::BookNotFound(_) => ErrorKind::NotFound,
            Self::DuplicateIsbn(_) => ErrorKind::Conflict,
            Self::Store(_) | Self::InconsistentState(_) => ErrorKind::Internal,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::AuthorNotFound(id) => write!(f, "author not found: {id}"),
            Self::BookNotFound(id) => write!(f, "book not found: {id}"),
            Self::DuplicateIsbn(isbn) => write!(f, "a book with isbn {isbn} already exists"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent catalog state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InputError> for ServiceError {
    fn from(value: InputError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Validation(err) => Self::Validation(err),
            StoreError::AuthorNotFound(id) => Self::AuthorNotFound(id),
            StoreError::BookNotFound(id) => Self::BookNotFound(id),
            StoreError::DuplicateIsbn(isbn) => Self::DuplicateIsbn(isbn),
            other => Self::Store(other),
        }
    }
}

/// Result of a search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Keyword missing or blank; callers show the unfiltered list instead.
    NoQuery,
    Matches(Vec<Book>),
}

/// Outcome of deleting a single book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookDeletion {
    pub book_id: BookId,
    pub author_id: AuthorId,
    /// `true` when the book was the author's last and the author went too.
    pub author_removed: bool,
}

/// Book detail view: the book and its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookDetail {
    pub book: Book,
    pub author: Author,
}

/// Author detail view: the author and all of their books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorDetail {
    pub author: Author,
    pub books: Vec<Book>,
}

/// Result of a bulk admin action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManageOutcome {
    AuthorDeleted(AuthorDeletion),
    BookDeleted(BookDeletion),
    AuthorUpdated(Author),
    BookUpdated(Book),
}

/// Catalog service facade over a store implementation.
pub struct CatalogService<S: CatalogStore> {
    store: S,
}

impl<S: CatalogStore> CatalogService<S> {
    /// Creates a service owning the provided store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Gives the store back, e.g. to release the connection borrow at shutdown.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Lists every book in insertion order (home page).
    pub fn list_books(&self) -> ServiceResult<Vec<Book>> {
        Ok(self.store.list_books()?)
    }

    /// Lists authors by name (author picker of the add-book form).
    pub fn list_authors(&self) -> ServiceResult<Vec<Author>> {
        Ok(self.store.list_authors()?)
    }

    /// Creates an author from the add-author form.
    pub fn add_author(&self, form: &AuthorForm) -> ServiceResult<Author> {
        report("author_create", self.add_author_inner(form))
    }

    fn add_author_inner(&self, form: &AuthorForm) -> ServiceResult<Author> {
        let draft = form.parse()?;
        let author = self.store.in_transaction(|store| {
            let id = store.create_author(&draft)?;
            store.get_author(id)
        })?;
        let author = author.ok_or(ServiceError::InconsistentState(
            "created author not found in read-back",
        ))?;

        info!(
            "event=author_create module=service status=ok author_id={}",
            author.id
        );
        Ok(author)
    }

    /// Creates a book from the add-book form. Author existence and ISBN
    /// uniqueness are checked by the store.
    pub fn add_book(&self, form: &BookForm) -> ServiceResult<Book> {
        report("book_create", self.add_book_inner(form))
    }

    fn add_book_inner(&self, form: &BookForm) -> ServiceResult<Book> {
        let draft = form.parse()?;
        let book = self.store.in_transaction(|store| {
            let id = store.create_book(&draft)?;
            store.get_book(id)
        })?;
        let book = book.ok_or(ServiceError::InconsistentState(
            "created book not found in read-back",
        ))?;

        info!(
            "event=book_create module=service status=ok book_id={} author_id={}",
            book.id, book.author_id
        );
        Ok(book)
    }

    /// Searches titles; a missing or blank keyword yields `NoQuery`.
    pub fn search(&self, keyword: Option<&str>) -> ServiceResult<SearchOutcome> {
        let keyword = keyword.map(str::trim).unwrap_or_default();
        if keyword.is_empty() {
            return Ok(SearchOutcome::NoQuery);
        }

        let result = self
            .store
            .search_books_by_title(keyword)
            .map_err(ServiceError::from);
        let books = report("catalog_search", result)?;
        info!(
            "event=catalog_search module=service status=ok hits={}",
            books.len()
        );
        Ok(SearchOutcome::Matches(books))
    }

    pub fn book_detail(&self, book_id: BookId) -> ServiceResult<BookDetail> {
        let book = self
            .store
            .get_book(book_id)?
            .ok_or(ServiceError::BookNotFound(book_id))?;
        let author = self.store.get_author(book.author_id)?.ok_or(
            ServiceError::InconsistentState("book references a missing author"),
        )?;
        Ok(BookDetail { book, author })
    }

    pub fn author_detail(&self, author_id: AuthorId) -> ServiceResult<AuthorDetail> {
        let author = self
            .store
            .get_author(author_id)?
            .ok_or(ServiceError::AuthorNotFound(author_id))?;
        let books = self.store.list_books_by_author(author_id)?;
        Ok(AuthorDetail { author, books })
    }

    /// Sets a book's rating from raw form text.
    pub fn rate_book(&self, book_id: BookId, raw_rating: &str) -> ServiceResult<Book> {
        report("book_rate", self.rate_book_inner(book_id, raw_rating))
    }

    fn rate_book_inner(&self, book_id: BookId, raw_rating: &str) -> ServiceResult<Book> {
        let rating: i64 = parse_required("rating", raw_rating)?;
        let book = self.store.in_transaction(|store| {
            store.set_book_rating(book_id, rating)?;
            store.get_book(book_id)
        })?;
        let book = book.ok_or(ServiceError::InconsistentState(
            "rated book not found in read-back",
        ))?;

        info!(
            "event=book_rate module=service status=ok book_id={} rating={}",
            book.id, rating
        );
        Ok(book)
    }

    /// Deletes one book; when it was the author's last, deletes the author in
    /// the same transaction.
    pub fn delete_book_cascading(&self, book_id: BookId) -> ServiceResult<BookDeletion> {
        report("book_delete", self.delete_book_inner(book_id))
    }

    fn delete_book_inner(&self, book_id: BookId) -> ServiceResult<BookDeletion> {
        let deletion = self.store.in_transaction(|store| {
            let author_id = store.delete_book(book_id)?;
            let author_removed = if store.count_books_by_author(author_id)? == 0 {
                store.delete_author(author_id)?;
                true
            } else {
                false
            };
            Ok(BookDeletion {
                book_id,
                author_id,
                author_removed,
            })
        })?;

        info!(
            "event=book_delete module=service status=ok book_id={} author_id={} author_removed={}",
            deletion.book_id, deletion.author_id, deletion.author_removed
        );
        Ok(deletion)
    }

    /// Deletes an author together with all of their books.
    pub fn delete_author_cascading(&self, author_id: AuthorId) -> ServiceResult<AuthorDeletion> {
        report("author_delete", self.delete_author_inner(author_id))
    }

    fn delete_author_inner(&self, author_id: AuthorId) -> ServiceResult<AuthorDeletion> {
        let deletion = self
            .store
            .in_transaction(|store| store.delete_author(author_id))?;

        info!(
            "event=author_delete module=service status=ok author_id={} books_removed={}",
            deletion.author_id, deletion.books_removed
        );
        Ok(deletion)
    }

    /// Applies a partial author update; see [`AuthorForm::parse_update`].
    pub fn update_author(
        &self,
        author_id: AuthorId,
        update: &AuthorUpdate,
    ) -> ServiceResult<Author> {
        let result = self
            .store
            .in_transaction(|store| store.update_author(author_id, update))
            .map_err(ServiceError::from);
        let author = report("author_update", result)?;
        info!("event=author_update module=service status=ok author_id={author_id}");
        Ok(author)
    }

    /// Applies a partial book update; see `BookUpdateForm::parse`.
    pub fn update_book(&self, book_id: BookId, update: &BookUpdate) -> ServiceResult<Book> {
        let result = self
            .store
            .in_transaction(|store| store.update_book(book_id, update))
            .map_err(ServiceError::from);
        let book = report("book_update", result)?;
        info!("event=book_update module=service status=ok book_id={book_id}");
        Ok(book)
    }

    /// Decodes and runs one bulk admin action.
    pub fn manage(&self, form: &ManageForm) -> ServiceResult<ManageOutcome> {
        let action = report("catalog_manage", form.parse().map_err(ServiceError::from))?;
        match action {
            ManageAction::DeleteAuthor(author_id) => self
                .delete_author_cascading(author_id)
                .map(ManageOutcome::AuthorDeleted),
            ManageAction::DeleteBook(book_id) => self
                .delete_book_cascading(book_id)
                .map(ManageOutcome::BookDeleted),
            ManageAction::UpdateAuthor { author_id, update } => self
                .update_author(author_id, &update)
                .map(ManageOutcome::AuthorUpdated),
            ManageAction::UpdateBook { book_id, update } => self
                .update_book(book_id, &update)
                .map(ManageOutcome::BookUpdated),
        }
    }
}

/// Logs a failed use-case once, at a level matching its error class.
fn report<T>(event: &'static str, result: ServiceResult<T>) -> ServiceResult<T> {
    if let Err(err) = &result {
        match err.kind() {
            ErrorKind::Internal => {
                error!("event={event} module=service status=error error={err}");
            }
            kind => {
                warn!("event={event} module=service status=rejected reason={kind:?}");
            }
        }
    }
    result
}
