//! Typed request forms for catalog use-cases.
//!
//! # Responsibility
//! - Carry raw text fields exactly as an HTML form or CLI submits them.
//! - Parse them into typed drafts/updates before anything reaches the store.
//!
//! # Invariants
//! - Create forms: a blank optional field means "absent".
//! - Update forms: a blank field means "leave unchanged".
//! - Dates use `YYYY-MM-DD`.

use crate::model::author::{AuthorId, AuthorUpdate, NewAuthor};
use crate::model::book::{validate_rating, BookId, BookUpdate, NewBook};
use chrono::NaiveDate;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A form field that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputError {
    pub field: &'static str,
    pub message: String,
}

impl InputError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl Display for InputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid `{}`: {}", self.field, self.message)
    }
}

impl Error for InputError {}

/// Add-author form (`name`, `birth_date`, `date_of_death`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthorForm {
    pub name: String,
    pub birth_date: String,
    pub date_of_death: String,
}

impl AuthorForm {
    /// Parses the dates; name rules are left to model validation.
    pub fn parse(&self) -> Result<NewAuthor, InputError> {
        Ok(NewAuthor {
            name: self.name.clone(),
            birth_date: parse_optional_date("birth_date", &self.birth_date)?,
            date_of_death: parse_optional_date("date_of_death", &self.date_of_death)?,
        })
    }

    /// Parses the form as a partial update; blank fields stay unchanged.
    pub fn parse_update(&self) -> Result<AuthorUpdate, InputError> {
        Ok(AuthorUpdate {
            name: non_blank(&self.name).map(str::to_string),
            birth_date: parse_optional_date("birth_date", &self.birth_date)?.map(Some),
            date_of_death: parse_optional_date("date_of_death", &self.date_of_death)?
                .map(Some),
        })
    }
}

/// Add-book form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BookForm {
    pub isbn: String,
    pub title: String,
    pub publication_year: String,
    pub author_id: String,
    pub rating: String,
}

impl BookForm {
    pub fn parse(&self) -> Result<NewBook, InputError> {
        Ok(NewBook {
            isbn: self.isbn.clone(),
            title: self.title.clone(),
            publication_year: parse_required("publication_year", &self.publication_year)?,
            author_id: parse_required("author_id", &self.author_id)?,
            rating: parse_optional_rating(&self.rating)?,
        })
    }
}

/// Book update form; `isbn` and the author link cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BookUpdateForm {
    pub title: String,
    pub publication_year: String,
    pub rating: String,
}

impl BookUpdateForm {
    pub fn parse(&self) -> Result<BookUpdate, InputError> {
        Ok(BookUpdate {
            title: non_blank(&self.title).map(str::to_string),
            publication_year: parse_optional("publication_year", &self.publication_year)?,
            rating: parse_optional_rating(&self.rating)?.map(Some),
        })
    }
}

/// Bulk admin form: one `action` plus the fields that action needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManageForm {
    /// One of `delete_author`, `delete_book`, `update_author`, `update_book`.
    pub action: String,
    pub author_id: String,
    pub book_id: String,
    pub name: String,
    pub birth_date: String,
    pub date_of_death: String,
    pub title: String,
    pub publication_year: String,
    pub rating: String,
}

/// Admin action decoded from a [`ManageForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManageAction {
    DeleteAuthor(AuthorId),
    DeleteBook(BookId),
    UpdateAuthor {
        author_id: AuthorId,
        update: AuthorUpdate,
    },
    UpdateBook {
        book_id: BookId,
        update: BookUpdate,
    },
}

impl ManageForm {
    pub fn parse(&self) -> Result<ManageAction, InputError> {
        match self.action.trim() {
            "delete_author" => Ok(ManageAction::DeleteAuthor(parse_required(
                "author_id",
                &self.author_id,
            )?)),
            "delete_book" => Ok(ManageAction::DeleteBook(parse_required(
                "book_id",
                &self.book_id,
            )?)),
            "update_author" => {
                let author_id = parse_required("author_id", &self.author_id)?;
                let update = AuthorForm {
                    name: self.name.clone(),
                    birth_date: self.birth_date.clone(),
                    date_of_death: self.date_of_death.clone(),
                }
                .parse_update()?;
                Ok(ManageAction::UpdateAuthor { author_id, update })
            }
            "update_book" => {
                let book_id = parse_required("book_id", &self.book_id)?;
                let update = BookUpdateForm {
                    title: self.title.clone(),
                    publication_year: self.publication_year.clone(),
                    rating: self.rating.clone(),
                }
                .parse()?;
                Ok(ManageAction::UpdateBook { book_id, update })
            }
            "" => Err(InputError::new("action", "is required")),
            other => Err(InputError::new(
                "action",
                format!(
                    "unknown action `{other}`; expected delete_author|delete_book|update_author|update_book"
                ),
            )),
        }
    }
}

/// Parses a `YYYY-MM-DD` date; blank input is `None`.
pub fn parse_optional_date(
    field: &'static str,
    raw: &str,
) -> Result<Option<NaiveDate>, InputError> {
    let Some(value) = non_blank(raw) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(Some)
        .map_err(|_| InputError::new(field, format!("`{value}` is not a YYYY-MM-DD date")))
}

/// Parses a rating field; blank input is `None`.
pub fn parse_optional_rating(raw: &str) -> Result<Option<u8>, InputError> {
    let Some(value) = parse_optional::<i64>("rating", raw)? else {
        return Ok(None);
    };
    validate_rating(value)
        .map(Some)
        .map_err(|err| InputError::new("rating", err.to_string()))
}

pub(crate) fn parse_required<T: FromStr>(field: &'static str, raw: &str) -> Result<T, InputError> {
    parse_optional(field, raw)?.ok_or_else(|| InputError::new(field, "is required"))
}

fn parse_optional<T: FromStr>(field: &'static str, raw: &str) -> Result<Option<T>, InputError> {
    let Some(value) = non_blank(raw) else {
        return Ok(None);
    };
    value
        .parse::<T>()
        .map(Some)
        .map_err(|_| InputError::new(field, format!("`{value}` is not a whole number")))
}

fn non_blank(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::{AuthorForm, BookForm, ManageAction, ManageForm};
    use crate::model::author::AuthorUpdate;
    use chrono::NaiveDate;

    #[test]
    fn author_form_treats_blank_dates_as_absent() {
        let form = AuthorForm {
            name: "New Author".to_string(),
            birth_date: "1980-01-01".to_string(),
            date_of_death: String::new(),
        };
        let draft = form.parse().unwrap();
        assert_eq!(draft.birth_date, NaiveDate::from_ymd_opt(1980, 1, 1));
        assert_eq!(draft.date_of_death, None);
    }

    #[test]
    fn malformed_date_names_the_field() {
        let form = AuthorForm {
            name: "Someone".to_string(),
            birth_date: "31/07/1965".to_string(),
            ..AuthorForm::default()
        };
        let err = form.parse().unwrap_err();
        assert_eq!(err.field, "birth_date");
    }

    #[test]
    fn book_form_requires_numeric_ids() {
        let form = BookForm {
            isbn: "9876543210987".to_string(),
            title: "New Book".to_string(),
            publication_year: "2021".to_string(),
            author_id: "abc".to_string(),
            rating: String::new(),
        };
        assert_eq!(form.parse().unwrap_err().field, "author_id");

        let missing_year = BookForm {
            publication_year: " ".to_string(),
            author_id: "1".to_string(),
            ..form
        };
        let err = missing_year.parse().unwrap_err();
        assert_eq!(err.field, "publication_year");
        assert_eq!(err.message, "is required");
    }

    #[test]
    fn book_form_rejects_out_of_range_rating() {
        let form = BookForm {
            isbn: "9876543210987".to_string(),
            title: "New Book".to_string(),
            publication_year: "2021".to_string(),
            author_id: "1".to_string(),
            rating: "11".to_string(),
        };
        assert_eq!(form.parse().unwrap_err().field, "rating");
    }

    #[test]
    fn manage_form_decodes_each_action() {
        let delete = ManageForm {
            action: "delete_book".to_string(),
            book_id: "4".to_string(),
            ..ManageForm::default()
        };
        assert_eq!(delete.parse().unwrap(), ManageAction::DeleteBook(4));

        let update = ManageForm {
            action: "update_author".to_string(),
            author_id: "2".to_string(),
            name: "Renamed".to_string(),
            ..ManageForm::default()
        };
        assert_eq!(
            update.parse().unwrap(),
            ManageAction::UpdateAuthor {
                author_id: 2,
                update: AuthorUpdate {
                    name: Some("Renamed".to_string()),
                    ..AuthorUpdate::default()
                },
            }
        );
    }

    #[test]
    fn manage_form_rejects_unknown_action() {
        let form = ManageForm {
            action: "drop_everything".to_string(),
            ..ManageForm::default()
        };
        assert_eq!(form.parse().unwrap_err().field, "action");
    }
}
