//! Command line front end for the library catalog.
//!
//! # Responsibility
//! - Resolve configuration (database path, logging) from flags and env.
//! - Map each catalog operation to one subcommand and print the result.
//! - Own the connection lifecycle: open at start, close before exit.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use library_core::{
    close_db, default_log_level, init_logging, open_db, Author, AuthorForm, Book, BookForm,
    CatalogService, ManageForm, ManageOutcome, SearchOutcome, SqliteCatalogStore,
};
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "library",
    about = "Manage a library catalog of authors and books",
    version,
    arg_required_else_help = true
)]
struct Cli {
    /// SQLite database file; created with its parent directory if missing.
    #[arg(long, env = "LIBRARY_DB_PATH", default_value = "data/library.sqlite")]
    db: PathBuf,
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LIBRARY_LOG_LEVEL")]
    log_level: Option<String>,
    /// Absolute directory for rotated log files. Logging is off when unset.
    #[arg(long, env = "LIBRARY_LOG_DIR")]
    log_dir: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every book.
    List,
    /// List every author.
    Authors,
    /// Add an author.
    AddAuthor(AuthorArgs),
    /// Add a book for an existing author.
    AddBook(BookArgs),
    /// Search book titles (case-insensitive substring).
    Search {
        keyword: Option<String>,
    },
    /// Show one book and its author.
    Book { id: i64 },
    /// Show one author and their books.
    Author { id: i64 },
    /// Rate a book from 1 to 10.
    Rate { id: i64, rating: String },
    /// Delete a book; its author goes too if it was their last book.
    DeleteBook { id: i64 },
    /// Bulk admin: delete_author, delete_book, update_author or update_book.
    Manage(ManageArgs),
}

#[derive(Args)]
struct AuthorArgs {
    #[arg(long)]
    name: String,
    /// YYYY-MM-DD
    #[arg(long, default_value = "")]
    birth_date: String,
    /// YYYY-MM-DD
    #[arg(long, default_value = "")]
    date_of_death: String,
}

#[derive(Args)]
struct BookArgs {
    #[arg(long)]
    isbn: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    publication_year: String,
    #[arg(long)]
    author_id: String,
    #[arg(long, default_value = "")]
    rating: String,
}

#[derive(Args)]
struct ManageArgs {
    action: String,
    #[arg(long, default_value = "")]
    author_id: String,
    #[arg(long, default_value = "")]
    book_id: String,
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long, default_value = "")]
    birth_date: String,
    #[arg(long, default_value = "")]
    date_of_death: String,
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, default_value = "")]
    publication_year: String,
    #[arg(long, default_value = "")]
    rating: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).map_err(anyhow::Error::msg)?;
    }

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open catalog at {}", cli.db.display()))?;
    let result = {
        let store = SqliteCatalogStore::try_new(&conn).context("catalog schema check failed")?;
        run(&CatalogService::new(store), cli.command)
    };
    close_db(conn).context("failed to close catalog")?;
    result
}

fn run(service: &CatalogService<SqliteCatalogStore<'_>>, command: Command) -> Result<()> {
    match command {
        Command::List => print_books(&service.list_books()?),
        Command::Authors => {
            for author in service.list_authors()? {
                print_author(&author);
            }
        }
        Command::AddAuthor(args) => {
            let author = service.add_author(&AuthorForm {
                name: args.name,
                birth_date: args.birth_date,
                date_of_death: args.date_of_death,
            })?;
            print_author(&author);
        }
        Command::AddBook(args) => {
            let book = service.add_book(&BookForm {
                isbn: args.isbn,
                title: args.title,
                publication_year: args.publication_year,
                author_id: args.author_id,
                rating: args.rating,
            })?;
            print_book(&book);
        }
        Command::Search { keyword } => match service.search(keyword.as_deref())? {
            SearchOutcome::NoQuery => print_books(&service.list_books()?),
            SearchOutcome::Matches(books) if books.is_empty() => println!("no matching books"),
            SearchOutcome::Matches(books) => print_books(&books),
        },
        Command::Book { id } => {
            let detail = service.book_detail(id)?;
            print_book(&detail.book);
            print_author(&detail.author);
        }
        Command::Author { id } => {
            let detail = service.author_detail(id)?;
            print_author(&detail.author);
            print_books(&detail.books);
        }
        Command::Rate { id, rating } => print_book(&service.rate_book(id, &rating)?),
        Command::DeleteBook { id } => {
            let deletion = service.delete_book_cascading(id)?;
            println!("deleted book {}", deletion.book_id);
            if deletion.author_removed {
                println!("deleted author {} (no books left)", deletion.author_id);
            }
        }
        Command::Manage(args) => {
            let form = ManageForm {
                action: args.action,
                author_id: args.author_id,
                book_id: args.book_id,
                name: args.name,
                birth_date: args.birth_date,
                date_of_death: args.date_of_death,
                title: args.title,
                publication_year: args.publication_year,
                rating: args.rating,
            };
            match service.manage(&form)? {
                ManageOutcome::AuthorDeleted(deletion) => println!(
                    "deleted author {} and {} book(s)",
                    deletion.author_id, deletion.books_removed
                ),
                ManageOutcome::BookDeleted(deletion) => {
                    println!("deleted book {}", deletion.book_id);
                    if deletion.author_removed {
                        println!("deleted author {} (no books left)", deletion.author_id);
                    }
                }
                ManageOutcome::AuthorUpdated(author) => print_author(&author),
                ManageOutcome::BookUpdated(book) => print_book(&book),
            }
        }
    }

    info!("event=cli_command module=cli status=ok");
    Ok(())
}

fn print_books(books: &[Book]) {
    if books.is_empty() {
        println!("no books");
    }
    for book in books {
        print_book(book);
    }
}

fn print_book(book: &Book) {
    let rating = book
        .rating
        .map_or_else(|| "unrated".to_string(), |value| format!("{value}/10"));
    println!(
        "book {}: {} ({}) isbn={} author={} rating={rating}",
        book.id, book.title, book.publication_year, book.isbn, book.author_id
    );
}

fn print_author(author: &Author) {
    let born = author
        .birth_date
        .map_or_else(|| "?".to_string(), |date| date.to_string());
    let died = author
        .date_of_death
        .map_or_else(String::new, |date| format!(" - {date}"));
    println!("author {}: {} ({born}{died})", author.id, author.name);
}
