//! Versioned catalog schema.
//!
//! Each step is a plain SQL file applied in order:
//! - `0001_init.sql`: `authors` and `books`, with `books.author_id` declared
//!   `ON DELETE CASCADE` and `books.isbn` unique.
//! - `0002_book_rating.sql`: nullable `books.rating`, bounded by a CHECK.
//!
//! # Invariants
//! - Step numbers only grow; a shipped file is never edited, only followed.
//! - `PRAGMA user_version` holds the last applied step.
//! - Pending steps run under one write lock, so two processes opening the
//!   same fresh file never apply a step twice.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "init",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "book_rating",
        sql: include_str!("0002_book_rating.sql"),
    },
];

/// Schema version this build writes and expects.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Schema version recorded in the database file.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Brings the catalog schema up to [`latest_version`].
///
/// # Errors
/// - [`DbError::UnsupportedSchemaVersion`] when the file was written by a
///   newer build. Nothing is touched in that case.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let latest = latest_version();
    if check_version(current_version(conn)?, latest)? {
        return Ok(());
    }

    // Re-read under the write lock: another connection may have migrated
    // between the first read and `BEGIN IMMEDIATE`.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current = current_version(&tx)?;
    if check_version(current, latest)? {
        return Ok(());
    }

    for step in SCHEMA_STEPS.iter().filter(|step| step.version > current) {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        info!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={current} to_version={latest}");
    Ok(())
}

/// `Ok(true)` when the schema is already current.
fn check_version(current: u32, latest: u32) -> DbResult<bool> {
    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    Ok(current == latest)
}
