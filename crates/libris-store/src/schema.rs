// SPDX-License-Identifier: Apache-2.0

use crate::StoreError;
use rusqlite::Connection;

pub const SCHEMA_VERSION: i64 = 1;

pub(crate) fn init(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode=WAL;
        PRAGMA foreign_keys=ON;
        PRAGMA synchronous=NORMAL;
        PRAGMA temp_store=MEMORY;
        CREATE TABLE IF NOT EXISTS books (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          title TEXT NOT NULL,
          author TEXT NOT NULL,
          title_normalized TEXT NOT NULL,
          author_normalized TEXT NOT NULL,
          isbn TEXT NOT NULL UNIQUE,
          total_copies INTEGER NOT NULL CHECK (total_copies >= 1),
          available_copies INTEGER NOT NULL
            CHECK (available_copies >= 0 AND available_copies <= total_copies)
        );
        CREATE TABLE IF NOT EXISTS loans (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          patron_id TEXT NOT NULL,
          book_id INTEGER NOT NULL REFERENCES books(id),
          borrowed_on TEXT NOT NULL,
          due_on TEXT NOT NULL,
          returned_on TEXT
        );
        CREATE TABLE IF NOT EXISTS libris_meta (
          k TEXT PRIMARY KEY,
          v TEXT NOT NULL
        ) WITHOUT ROWID;
        CREATE INDEX IF NOT EXISTS idx_books_title_normalized ON books(title_normalized);
        CREATE INDEX IF NOT EXISTS idx_books_author_normalized ON books(author_normalized);
        CREATE INDEX IF NOT EXISTS idx_loans_patron_active ON loans(patron_id, returned_on);
        CREATE INDEX IF NOT EXISTS idx_loans_book_patron ON loans(book_id, patron_id);
        ",
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO libris_meta (k, v) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO libris_meta (k, v) VALUES ('revision', '0')",
        [],
    )?;
    Ok(())
}
