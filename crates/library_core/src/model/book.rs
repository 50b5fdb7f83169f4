//! Book records and book-level rules (ISBN length, rating bounds).

use super::author::AuthorId;
use super::{
    CatalogValidationError, BOOK_TITLE_MAX_CHARS, ISBN_MAX_CHARS, RATING_MAX, RATING_MIN,
};
use serde::{Deserialize, Serialize};

/// Auto-assigned book identity (`books.id`).
pub type BookId = i64;

/// Persisted book row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    /// Stored as submitted, minus surrounding whitespace.
    pub isbn: String,
    pub title: String,
    pub publication_year: i32,
    /// `None` until someone rates the book.
    pub rating: Option<u8>,
    pub author_id: AuthorId,
}

/// Book fields supplied at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub isbn: String,
    pub title: String,
    pub publication_year: i32,
    pub author_id: AuthorId,
    pub rating: Option<u8>,
}

impl NewBook {
    pub fn new(
        isbn: impl Into<String>,
        title: impl Into<String>,
        publication_year: i32,
        author_id: AuthorId,
    ) -> Self {
        Self {
            isbn: isbn.into(),
            title: title.into(),
            publication_year,
            author_id,
            rating: None,
        }
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Validates the draft and returns the ISBN in its stored form.
    pub fn validate(&self) -> Result<String, CatalogValidationError> {
        validate_title(&self.title)?;
        if let Some(rating) = self.rating {
            validate_rating(i64::from(rating))?;
        }
        validate_isbn(&self.isbn)
    }
}

/// Partial book update over the mutable fields. `isbn` and `author_id` are
/// fixed at creation. For `rating`, `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub rating: Option<Option<u8>>,
}

impl BookUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.publication_year.is_none() && self.rating.is_none()
    }

    pub fn apply_to(&self, current: &Book) -> Result<Book, CatalogValidationError> {
        let merged = Book {
            title: self.title.clone().unwrap_or_else(|| current.title.clone()),
            publication_year: self.publication_year.unwrap_or(current.publication_year),
            rating: self.rating.unwrap_or(current.rating),
            ..current.clone()
        };
        validate_title(&merged.title)?;
        if let Some(rating) = merged.rating {
            validate_rating(i64::from(rating))?;
        }
        Ok(merged)
    }
}

/// Trims the ISBN and checks it is non-blank and at most
/// [`ISBN_MAX_CHARS`] characters. The inner text is never rewritten, so
/// uniqueness applies to the string exactly as submitted.
pub fn validate_isbn(raw: &str) -> Result<String, CatalogValidationError> {
    let isbn = raw.trim();
    if isbn.is_empty() {
        return Err(CatalogValidationError::EmptyIsbn);
    }
    if isbn.chars().count() > ISBN_MAX_CHARS {
        return Err(CatalogValidationError::IsbnTooLong {
            max_chars: ISBN_MAX_CHARS,
        });
    }
    Ok(isbn.to_string())
}

/// Checks a raw rating against the accepted `1..=10` range.
pub fn validate_rating(value: i64) -> Result<u8, CatalogValidationError> {
    match u8::try_from(value) {
        Ok(rating) if (RATING_MIN..=RATING_MAX).contains(&rating) => Ok(rating),
        _ => Err(CatalogValidationError::RatingOutOfRange(value)),
    }
}

fn validate_title(title: &str) -> Result<(), CatalogValidationError> {
    if title.trim().is_empty() {
        return Err(CatalogValidationError::EmptyTitle);
    }
    if title.chars().count() > BOOK_TITLE_MAX_CHARS {
        return Err(CatalogValidationError::TitleTooLong {
            max_chars: BOOK_TITLE_MAX_CHARS,
        });
    }
    Ok(())
}
