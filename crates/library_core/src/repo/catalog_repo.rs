//! Catalog store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist authors and books with referential integrity.
//! - Map SQLite constraint failures to catalog errors.
//!
//! # Invariants
//! - Deleting an author removes its books through `ON DELETE CASCADE` only;
//!   this module never deletes books on an author's behalf.
//! - Multi-statement operations run inside one `BEGIN IMMEDIATE` transaction,
//!   or join the caller's transaction when one is already open.
//! - `isbn` and `author_id` are never rewritten after insert.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::author::{Author, AuthorId, AuthorUpdate, NewAuthor};
use crate::model::book::{validate_rating, Book, BookId, BookUpdate, NewBook};
use crate::model::CatalogValidationError;
use rusqlite::{ffi, params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const AUTHOR_SELECT_SQL: &str = "SELECT id, name, birth_date, date_of_death FROM authors";
const BOOK_SELECT_SQL: &str =
    "SELECT id, isbn, title, publication_year, rating, author_id FROM books";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("authors", &["id", "name", "birth_date", "date_of_death"]),
    (
        "books",
        &["id", "isbn", "title", "publication_year", "rating", "author_id"],
    ),
];

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from catalog store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Entity failed model validation; nothing was written.
    Validation(CatalogValidationError),
    AuthorNotFound(AuthorId),
    BookNotFound(BookId),
    /// Another book already uses this ISBN.
    DuplicateIsbn(String),
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::AuthorNotFound(id) => write!(f, "author not found: {id}"),
            Self::BookNotFound(id) => write!(f, "book not found: {id}"),
            Self::DuplicateIsbn(isbn) => write!(f, "a book with isbn {isbn} already exists"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "catalog store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "catalog store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "catalog store requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid catalog data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CatalogValidationError> for StoreError {
    fn from(value: CatalogValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Outcome of deleting an author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorDeletion {
    pub author_id: AuthorId,
    /// Books removed by the cascade together with the author.
    pub books_removed: u64,
}

/// Storage contract for the catalog.
pub trait CatalogStore {
    /// Runs `f` atomically: commits when it returns `Ok`, rolls back otherwise.
    /// Calls made while a transaction is already open join that transaction.
    fn in_transaction<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Self) -> StoreResult<T>;

    fn create_author(&self, author: &NewAuthor) -> StoreResult<AuthorId>;
    /// Fails with `AuthorNotFound` for a dangling `author_id` and with
    /// `DuplicateIsbn` when the ISBN is taken.
    fn create_book(&self, book: &NewBook) -> StoreResult<BookId>;
    fn get_author(&self, id: AuthorId) -> StoreResult<Option<Author>>;
    fn get_book(&self, id: BookId) -> StoreResult<Option<Book>>;
    /// All authors, by name then id.
    fn list_authors(&self) -> StoreResult<Vec<Author>>;
    /// All books in id (insertion) order.
    fn list_books(&self) -> StoreResult<Vec<Book>>;
    fn list_books_by_author(&self, author_id: AuthorId) -> StoreResult<Vec<Book>>;
    fn count_books_by_author(&self, author_id: AuthorId) -> StoreResult<u64>;
    /// Case-insensitive substring match on title, id order. The keyword is
    /// matched literally; blank keywords are the caller's concern.
    fn search_books_by_title(&self, keyword: &str) -> StoreResult<Vec<Book>>;
    fn update_author(&self, id: AuthorId, update: &AuthorUpdate) -> StoreResult<Author>;
    fn update_book(&self, id: BookId, update: &BookUpdate) -> StoreResult<Book>;
    fn set_book_rating(&self, id: BookId, rating: i64) -> StoreResult<()>;
    /// Deletes the author; its books go with it in the same statement.
    fn delete_author(&self, id: AuthorId) -> StoreResult<AuthorDeletion>;
    /// Deletes one book and returns the id of the author that owned it.
    fn delete_book(&self, id: BookId) -> StoreResult<AuthorId>;
}

/// SQLite-backed catalog store over a migrated connection.
pub struct SqliteCatalogStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogStore<'conn> {
    /// Wraps a connection returned by [`crate::db::open_db`] or
    /// [`crate::db::open_db_in_memory`]; anything else is checked and rejected
    /// if its schema does not match.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_catalog_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CatalogStore for SqliteCatalogStore<'_> {
    fn in_transaction<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Self) -> StoreResult<T>,
    {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        // Dropping `tx` on the error path rolls back.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    fn create_author(&self, author: &NewAuthor) -> StoreResult<AuthorId> {
        author.validate()?;

        self.conn.execute(
            "INSERT INTO authors (name, birth_date, date_of_death) VALUES (?1, ?2, ?3);",
            params![author.name.trim(), author.birth_date, author.date_of_death],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn create_book(&self, book: &NewBook) -> StoreResult<BookId> {
        let isbn = book.validate()?;

        self.in_transaction(|store| {
            if !author_exists(store.conn, book.author_id)? {
                return Err(StoreError::AuthorNotFound(book.author_id));
            }

            store
                .conn
                .execute(
                    "INSERT INTO books (isbn, title, publication_year, rating, author_id)
                     VALUES (?1, ?2, ?3, ?4, ?5);",
                    params![
                        isbn.as_str(),
                        book.title.trim(),
                        book.publication_year,
                        book.rating,
                        book.author_id,
                    ],
                )
                .map_err(|err| map_book_insert_error(err, &isbn, book.author_id))?;
            Ok(store.conn.last_insert_rowid())
        })
    }

    fn get_author(&self, id: AuthorId) -> StoreResult<Option<Author>> {
        let author = self
            .conn
            .query_row(
                &format!("{AUTHOR_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_author_row,
            )
            .optional()?;
        Ok(author)
    }

    fn get_book(&self, id: BookId) -> StoreResult<Option<Book>> {
        let book = self
            .conn
            .query_row(
                &format!("{BOOK_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_book_row,
            )
            .optional()?;
        Ok(book)
    }

    fn list_authors(&self) -> StoreResult<Vec<Author>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AUTHOR_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let authors = stmt
            .query_map([], parse_author_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(authors)
    }

    fn list_books(&self) -> StoreResult<Vec<Book>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BOOK_SELECT_SQL} ORDER BY id ASC;"))?;
        let books = stmt
            .query_map([], parse_book_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(books)
    }

    fn list_books_by_author(&self, author_id: AuthorId) -> StoreResult<Vec<Book>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BOOK_SELECT_SQL} WHERE author_id = ?1 ORDER BY id ASC;"
        ))?;
        let books = stmt
            .query_map([author_id], parse_book_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(books)
    }

    fn count_books_by_author(&self, author_id: AuthorId) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM books WHERE author_id = ?1;",
            [author_id],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| StoreError::InvalidData(format!("negative book count {count}")))
    }

    fn search_books_by_title(&self, keyword: &str) -> StoreResult<Vec<Book>> {
        let pattern = format!("%{}%", escape_like(keyword));
        let mut stmt = self.conn.prepare(&format!(
            "{BOOK_SELECT_SQL} WHERE title LIKE ?1 ESCAPE '\\' ORDER BY id ASC;"
        ))?;
        let books = stmt
            .query_map([pattern], parse_book_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(books)
    }

    fn update_author(&self, id: AuthorId, update: &AuthorUpdate) -> StoreResult<Author> {
        self.in_transaction(|store| {
            let current = store
                .get_author(id)?
                .ok_or(StoreError::AuthorNotFound(id))?;
            if update.is_empty() {
                return Ok(current);
            }

            let mut merged = update.apply_to(&current)?;
            merged.name = merged.name.trim().to_string();
            store.conn.execute(
                "UPDATE authors
                 SET name = ?2,
                     birth_date = ?3,
                     date_of_death = ?4
                 WHERE id = ?1;",
                params![id, merged.name, merged.birth_date, merged.date_of_death],
            )?;
            Ok(merged)
        })
    }

    fn update_book(&self, id: BookId, update: &BookUpdate) -> StoreResult<Book> {
        self.in_transaction(|store| {
            let current = store.get_book(id)?.ok_or(StoreError::BookNotFound(id))?;
            if update.is_empty() {
                return Ok(current);
            }

            let mut merged = update.apply_to(&current)?;
            merged.title = merged.title.trim().to_string();
            store.conn.execute(
                "UPDATE books
                 SET title = ?2,
                     publication_year = ?3,
                     rating = ?4
                 WHERE id = ?1;",
                params![id, merged.title, merged.publication_year, merged.rating],
            )?;
            Ok(merged)
        })
    }

    fn set_book_rating(&self, id: BookId, rating: i64) -> StoreResult<()> {
        let rating = validate_rating(rating)?;

        let changed = self.conn.execute(
            "UPDATE books SET rating = ?2 WHERE id = ?1;",
            params![id, rating],
        )?;
        if changed == 0 {
            return Err(StoreError::BookNotFound(id));
        }
        Ok(())
    }

    fn delete_author(&self, id: AuthorId) -> StoreResult<AuthorDeletion> {
        self.in_transaction(|store| {
            let books_removed = store.count_books_by_author(id)?;
            let changed = store
                .conn
                .execute("DELETE FROM authors WHERE id = ?1;", [id])?;
            if changed == 0 {
                return Err(StoreError::AuthorNotFound(id));
            }

            Ok(AuthorDeletion {
                author_id: id,
                books_removed,
            })
        })
    }

    fn delete_book(&self, id: BookId) -> StoreResult<AuthorId> {
        self.in_transaction(|store| {
            let author_id: AuthorId = store
                .conn
                .query_row("SELECT author_id FROM books WHERE id = ?1;", [id], |row| {
                    row.get(0)
                })
                .optional()?
                .ok_or(StoreError::BookNotFound(id))?;

            store.conn.execute("DELETE FROM books WHERE id = ?1;", [id])?;
            Ok(author_id)
        })
    }
}

fn parse_author_row(row: &Row<'_>) -> rusqlite::Result<Author> {
    Ok(Author {
        id: row.get("id")?,
        name: row.get("name")?,
        birth_date: row.get("birth_date")?,
        date_of_death: row.get("date_of_death")?,
    })
}

fn parse_book_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get("id")?,
        isbn: row.get("isbn")?,
        title: row.get("title")?,
        publication_year: row.get("publication_year")?,
        rating: row.get("rating")?,
        author_id: row.get("author_id")?,
    })
}

fn author_exists(conn: &Connection, id: AuthorId) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM authors WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn map_book_insert_error(err: rusqlite::Error, isbn: &str, author_id: AuthorId) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StoreError::DuplicateIsbn(isbn.to_string())
        }
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
        {
            StoreError::AuthorNotFound(author_id)
        }
        _ => err.into(),
    }
}

fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn ensure_catalog_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(StoreError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
