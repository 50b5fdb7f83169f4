//! Catalog domain model.
//!
//! # Responsibility
//! - Define the Author and Book records shared by store and service.
//! - Own entity-level validation rules, independent of storage.
//!
//! # Invariants
//! - Identities are auto-assigned integers and never reused by callers.
//! - A record that passed `validate()` is always storable.

pub mod author;
pub mod book;

use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum author name length, in characters.
pub const AUTHOR_NAME_MAX_CHARS: usize = 150;
/// Maximum book title length, in characters.
pub const BOOK_TITLE_MAX_CHARS: usize = 200;
/// Maximum ISBN length, in characters (`books.isbn` column width).
pub const ISBN_MAX_CHARS: usize = 13;
/// Lowest accepted book rating.
pub const RATING_MIN: u8 = 1;
/// Highest accepted book rating.
pub const RATING_MAX: u8 = 10;

/// Entity rule violations detected before anything reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogValidationError {
    EmptyName,
    NameTooLong { max_chars: usize },
    EmptyTitle,
    TitleTooLong { max_chars: usize },
    EmptyIsbn,
    IsbnTooLong { max_chars: usize },
    RatingOutOfRange(i64),
    DeathBeforeBirth {
        birth_date: NaiveDate,
        date_of_death: NaiveDate,
    },
}

impl Display for CatalogValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "author name must not be blank"),
            Self::NameTooLong { max_chars } => {
                write!(f, "author name must be at most {max_chars} characters")
            }
            Self::EmptyTitle => write!(f, "book title must not be blank"),
            Self::TitleTooLong { max_chars } => {
                write!(f, "book title must be at most {max_chars} characters")
            }
            Self::EmptyIsbn => write!(f, "isbn must not be blank"),
            Self::IsbnTooLong { max_chars } => {
                write!(f, "isbn must be at most {max_chars} characters")
            }
            Self::RatingOutOfRange(value) => write!(
                f,
                "rating {value} is out of range {RATING_MIN}..={RATING_MAX}"
            ),
            Self::DeathBeforeBirth {
                birth_date,
                date_of_death,
            } => write!(
                f,
                "date of death {date_of_death} precedes birth date {birth_date}"
            ),
        }
    }
}

impl Error for CatalogValidationError {}
