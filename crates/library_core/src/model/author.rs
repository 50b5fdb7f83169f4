//! Author records.
//!
//! # Invariants
//! - `name` is non-blank and at most [`AUTHOR_NAME_MAX_CHARS`] characters.
//! - `date_of_death` is never earlier than `birth_date` when both are set.

use super::{CatalogValidationError, AUTHOR_NAME_MAX_CHARS};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Auto-assigned author identity (`authors.id`).
pub type AuthorId = i64;

/// Persisted author row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

/// Author fields supplied at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthor {
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

impl NewAuthor {
    /// Creates an author draft with both dates absent.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            birth_date: None,
            date_of_death: None,
        }
    }

    pub fn with_birth_date(mut self, birth_date: NaiveDate) -> Self {
        self.birth_date = Some(birth_date);
        self
    }

    pub fn with_date_of_death(mut self, date_of_death: NaiveDate) -> Self {
        self.date_of_death = Some(date_of_death);
        self
    }

    pub fn validate(&self) -> Result<(), CatalogValidationError> {
        validate_author_fields(&self.name, self.birth_date, self.date_of_death)
    }
}

/// Partial author update. `None` leaves a field untouched; for the dates,
/// `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorUpdate {
    pub name: Option<String>,
    pub birth_date: Option<Option<NaiveDate>>,
    pub date_of_death: Option<Option<NaiveDate>>,
}

impl AuthorUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.birth_date.is_none() && self.date_of_death.is_none()
    }

    /// Returns `current` with this update merged in. The result is validated
    /// as a whole, so a new death date is checked against the stored birth date.
    pub fn apply_to(&self, current: &Author) -> Result<Author, CatalogValidationError> {
        let merged = Author {
            id: current.id,
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            birth_date: self.birth_date.unwrap_or(current.birth_date),
            date_of_death: self.date_of_death.unwrap_or(current.date_of_death),
        };
        validate_author_fields(&merged.name, merged.birth_date, merged.date_of_death)?;
        Ok(merged)
    }
}

fn validate_author_fields(
    name: &str,
    birth_date: Option<NaiveDate>,
    date_of_death: Option<NaiveDate>,
) -> Result<(), CatalogValidationError> {
    if name.trim().is_empty() {
        return Err(CatalogValidationError::EmptyName);
    }
    if name.chars().count() > AUTHOR_NAME_MAX_CHARS {
        return Err(CatalogValidationError::NameTooLong {
            max_chars: AUTHOR_NAME_MAX_CHARS,
        });
    }
    if let (Some(birth_date), Some(date_of_death)) = (birth_date, date_of_death) {
        if date_of_death < birth_date {
            return Err(CatalogValidationError::DeathBeforeBirth {
                birth_date,
                date_of_death,
            });
        }
    }
    Ok(())
}
