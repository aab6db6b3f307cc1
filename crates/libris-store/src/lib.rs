#![forbid(unsafe_code)]
//! SQLite persistence for the circulation service.
//!
//! One [`Store`] owns one connection. Borrow and return are single
//! transactions: the availability and loan-limit checks run inside the
//! same transaction as the writes they guard.

use rusqlite::Connection;
use std::fmt::{Display, Formatter};
use std::path::Path;

mod catalog;
mod loans;
mod schema;

pub use catalog::{BookPage, CatalogQuery, InsertOutcome, SearchMode};
pub use loans::PatronLoanRow;
pub use schema::SCHEMA_VERSION;

pub const CRATE_NAME: &str = "libris-store";

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    Sql(String),
    BookMissing,
    NoAvailableCopy,
    LoanLimitReached,
    NoActiveLoan,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sql(msg) => write!(f, "sqlite error: {msg}"),
            Self::BookMissing => f.write_str("book not found"),
            Self::NoAvailableCopy => f.write_str("no copies available"),
            Self::LoanLimitReached => f.write_str("patron is at the active loan limit"),
            Self::NoActiveLoan => f.write_str("no active loan for this patron and book"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sql(e.to_string())
    }
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        schema::init(&conn)?;
        tracing::info!(path = %path.display(), "store opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        Ok(Self { conn })
    }

    /// Readiness probe: answers once the schema is reachable.
    pub fn probe(&self) -> Result<(), StoreError> {
        self.conn
            .query_row("SELECT v FROM libris_meta WHERE k='schema_version'", [], |_| Ok(()))?;
        Ok(())
    }

    /// Monotonic revision bumped by every catalog or loan mutation.
    /// List responses derive their ETag from it.
    pub fn catalog_revision(&self) -> Result<i64, StoreError> {
        let raw: String =
            self.conn
                .query_row("SELECT v FROM libris_meta WHERE k='revision'", [], |row| {
                    row.get(0)
                })?;
        raw.parse::<i64>()
            .map_err(|e| StoreError::Sql(format!("revision corrupt: {e}")))
    }

    pub(crate) fn bump_revision(tx: &rusqlite::Transaction<'_>) -> Result<(), StoreError> {
        tx.execute(
            "UPDATE libris_meta SET v = CAST(v AS INTEGER) + 1 WHERE k='revision'",
            [],
        )?;
        Ok(())
    }
}
