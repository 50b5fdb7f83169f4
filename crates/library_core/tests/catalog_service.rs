use chrono::NaiveDate;
use library_core::db::{close_db, open_db, open_db_in_memory};
use library_core::{
    AuthorForm, AuthorUpdate, BookForm, CatalogService, CatalogStore, ErrorKind, ManageForm,
    ManageOutcome, SearchOutcome, ServiceError, SqliteCatalogStore,
};
use rusqlite::Connection;
use std::sync::{Arc, Barrier};
use std::thread;

fn author_form(name: &str, birth_date: &str) -> AuthorForm {
    AuthorForm {
        name: name.to_string(),
        birth_date: birth_date.to_string(),
        date_of_death: String::new(),
    }
}

fn book_form(isbn: &str, title: &str, author_id: i64) -> BookForm {
    BookForm {
        isbn: isbn.to_string(),
        title: title.to_string(),
        publication_year: "2020".to_string(),
        author_id: author_id.to_string(),
        rating: String::new(),
    }
}

fn service(conn: &Connection) -> CatalogService<SqliteCatalogStore<'_>> {
    CatalogService::new(SqliteCatalogStore::try_new(conn).unwrap())
}

#[test]
fn add_author_then_book_end_to_end() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let author = service
        .add_author(&author_form("New Author", "1980-01-01"))
        .unwrap();
    assert_eq!(author.birth_date, NaiveDate::from_ymd_opt(1980, 1, 1));
    assert_eq!(author.date_of_death, None);

    let book = service
        .add_book(&BookForm {
            isbn: "9876543210987".to_string(),
            title: "New Book".to_string(),
            publication_year: "2021".to_string(),
            author_id: author.id.to_string(),
            rating: "7".to_string(),
        })
        .unwrap();

    let detail = service.book_detail(book.id).unwrap();
    assert_eq!(detail.book.title, "New Book");
    assert_eq!(detail.book.publication_year, 2021);
    assert_eq!(detail.book.rating, Some(7));
    assert_eq!(detail.book.author_id, author.id);
    assert_eq!(detail.author.name, "New Author");
}

#[test]
fn add_author_rejects_malformed_date() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service
        .add_author(&author_form("Someone", "July 31st"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(matches!(err, ServiceError::InvalidInput(ref input) if input.field == "birth_date"));
    assert!(service.list_authors().unwrap().is_empty());
}

#[test]
fn add_book_error_kinds_match_failure_class() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let author = service.add_author(&author_form("Author", "")).unwrap();

    let missing_author = service
        .add_book(&book_form("1234567890123", "Lost", author.id + 100))
        .unwrap_err();
    assert_eq!(missing_author.kind(), ErrorKind::NotFound);

    service
        .add_book(&book_form("1234567890123", "First", author.id))
        .unwrap();
    let duplicate = service
        .add_book(&book_form("1234567890123", "Second", author.id))
        .unwrap_err();
    assert_eq!(duplicate.kind(), ErrorKind::Conflict);

    let bad_isbn = service
        .add_book(&book_form("97807475326991", "Too Long", author.id))
        .unwrap_err();
    assert_eq!(bad_isbn.kind(), ErrorKind::Validation);

    assert_eq!(service.list_books().unwrap().len(), 1);
}

#[test]
fn search_without_keyword_is_no_query() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert_eq!(service.search(None).unwrap(), SearchOutcome::NoQuery);
    assert_eq!(service.search(Some("   ")).unwrap(), SearchOutcome::NoQuery);
}

#[test]
fn search_matches_titles_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let author = service
        .add_author(&author_form("J.K. Rowling", "1965-07-31"))
        .unwrap();
    service
        .add_book(&book_form("1234567890123", "Test Book", author.id))
        .unwrap();

    match service.search(Some(" test ")).unwrap() {
        SearchOutcome::Matches(books) => {
            assert_eq!(books.len(), 1);
            assert_eq!(books[0].title, "Test Book");
        }
        SearchOutcome::NoQuery => panic!("expected matches"),
    }
    assert_eq!(
        service.search(Some("absent")).unwrap(),
        SearchOutcome::Matches(Vec::new())
    );
}

#[test]
fn deleting_sole_book_removes_author() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let author = service.add_author(&author_form("Solo", "")).unwrap();
    let book = service
        .add_book(&book_form("1234567890123", "Only Book", author.id))
        .unwrap();

    let deletion = service.delete_book_cascading(book.id).unwrap();
    assert!(deletion.author_removed);
    assert_eq!(deletion.author_id, author.id);

    let err = service.author_detail(author.id).unwrap_err();
    assert!(matches!(err, ServiceError::AuthorNotFound(id) if id == author.id));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn deleting_one_of_several_books_keeps_author() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let author = service.add_author(&author_form("Prolific", "")).unwrap();
    let first = service
        .add_book(&book_form("1000000000001", "One", author.id))
        .unwrap();
    let second = service
        .add_book(&book_form("1000000000002", "Two", author.id))
        .unwrap();

    let deletion = service.delete_book_cascading(first.id).unwrap();
    assert!(!deletion.author_removed);

    let detail = service.author_detail(author.id).unwrap();
    assert_eq!(detail.books.len(), 1);
    assert_eq!(detail.books[0].id, second.id);
}

#[test]
fn deleting_missing_book_is_not_found_and_changes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let author = service.add_author(&author_form("Author", "")).unwrap();
    service
        .add_book(&book_form("1234567890123", "Stays", author.id))
        .unwrap();

    let err = service.delete_book_cascading(999).unwrap_err();
    assert!(matches!(err, ServiceError::BookNotFound(999)));
    assert_eq!(service.list_books().unwrap().len(), 1);
    assert_eq!(service.list_authors().unwrap().len(), 1);
}

#[test]
fn delete_author_cascading_removes_all_their_books() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let gone = service.add_author(&author_form("Gone", "")).unwrap();
    let stays = service.add_author(&author_form("Stays", "")).unwrap();
    for (isbn, author_id) in [
        ("1000000000001", gone.id),
        ("1000000000002", gone.id),
        ("1000000000003", stays.id),
    ] {
        service
            .add_book(&book_form(isbn, "Some Title", author_id))
            .unwrap();
    }

    let deletion = service.delete_author_cascading(gone.id).unwrap();
    assert_eq!(deletion.books_removed, 2);
    assert!(service
        .list_books()
        .unwrap()
        .iter()
        .all(|book| book.author_id != gone.id));
    assert!(service.author_detail(stays.id).is_ok());
}

#[test]
fn rate_book_validates_and_applies() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let author = service.add_author(&author_form("Author", "")).unwrap();
    let book = service
        .add_book(&book_form("1234567890123", "Rate Me", author.id))
        .unwrap();
    assert_eq!(book.rating, None);

    let rated = service.rate_book(book.id, "8").unwrap();
    assert_eq!(rated.rating, Some(8));

    for raw in ["0", "11", "eight", ""] {
        let err = service.rate_book(book.id, raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "rating {raw:?}");
    }
    assert_eq!(service.book_detail(book.id).unwrap().book.rating, Some(8));

    let missing = service.rate_book(book.id + 1, "5").unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
}

#[test]
fn manage_dispatches_updates_and_deletes() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let author = service.add_author(&author_form("Old Name", "")).unwrap();
    let book = service
        .add_book(&book_form("1234567890123", "Old Title", author.id))
        .unwrap();

    let outcome = service
        .manage(&ManageForm {
            action: "update_author".to_string(),
            author_id: author.id.to_string(),
            name: "New Name".to_string(),
            ..ManageForm::default()
        })
        .unwrap();
    assert!(matches!(outcome, ManageOutcome::AuthorUpdated(ref a) if a.name == "New Name"));

    let outcome = service
        .manage(&ManageForm {
            action: "update_book".to_string(),
            book_id: book.id.to_string(),
            title: "New Title".to_string(),
            rating: "3".to_string(),
            ..ManageForm::default()
        })
        .unwrap();
    match outcome {
        ManageOutcome::BookUpdated(updated) => {
            assert_eq!(updated.title, "New Title");
            assert_eq!(updated.rating, Some(3));
            assert_eq!(updated.isbn, "1234567890123");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let outcome = service
        .manage(&ManageForm {
            action: "delete_book".to_string(),
            book_id: book.id.to_string(),
            ..ManageForm::default()
        })
        .unwrap();
    assert!(matches!(
        outcome,
        ManageOutcome::BookDeleted(deletion) if deletion.author_removed
    ));
    assert!(service.list_authors().unwrap().is_empty());
}

#[test]
fn manage_rejects_unknown_action() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service
        .manage(&ManageForm {
            action: "truncate".to_string(),
            ..ManageForm::default()
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn update_author_rejects_death_before_stored_birth() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let author = service
        .add_author(&author_form("Author", "1950-06-01"))
        .unwrap();

    let err = service
        .update_author(
            author.id,
            &AuthorUpdate {
                date_of_death: Some(NaiveDate::from_ymd_opt(1940, 1, 1)),
                ..AuthorUpdate::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(service.author_detail(author.id).unwrap().author.date_of_death, None);
}

#[test]
fn models_serialize_dates_as_iso_text() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let author = service
        .add_author(&author_form("J.K. Rowling", "1965-07-31"))
        .unwrap();

    let json = serde_json::to_value(&author).unwrap();
    assert_eq!(json["birth_date"], "1965-07-31");
    assert!(json["date_of_death"].is_null());
}

#[test]
fn service_hands_store_back() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    service.add_author(&author_form("Author", "")).unwrap();

    let store = service.into_store();
    assert_eq!(store.list_authors().unwrap().len(), 1);
}

#[test]
fn concurrent_last_book_deletes_remove_author_once() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("library.sqlite");

    let (author_id, book_ids) = {
        let conn = open_db(&db_path).unwrap();
        let service = service(&conn);
        let author = service.add_author(&author_form("Contested", "")).unwrap();
        let first = service
            .add_book(&book_form("1000000000001", "Left", author.id))
            .unwrap();
        let second = service
            .add_book(&book_form("1000000000002", "Right", author.id))
            .unwrap();
        drop(service);
        close_db(conn).unwrap();
        (author.id, [first.id, second.id])
    };

    let barrier = Arc::new(Barrier::new(book_ids.len()));
    let handles: Vec<_> = book_ids
        .into_iter()
        .map(|book_id| {
            let barrier = Arc::clone(&barrier);
            let db_path = db_path.clone();
            thread::spawn(move || {
                let conn = open_db(&db_path).unwrap();
                barrier.wait();
                let deletion = service(&conn).delete_book_cascading(book_id).unwrap();
                close_db(conn).unwrap();
                deletion
            })
        })
        .collect();
    let deletions: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(deletions.len(), 2);
    assert!(deletions.iter().all(|deletion| deletion.author_id == author_id));
    assert_eq!(
        deletions
            .iter()
            .filter(|deletion| deletion.author_removed)
            .count(),
        1
    );

    let conn = open_db(&db_path).unwrap();
    let store = SqliteCatalogStore::try_new(&conn).unwrap();
    assert_eq!(store.get_author(author_id).unwrap(), None);
    assert!(store.list_books().unwrap().is_empty());
}
