// SPDX-License-Identifier: Apache-2.0

use crate::{Store, StoreError};
use libris_model::{Book, BookId, Isbn, NewBook};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

const BOOK_COLUMNS: &str = "id, title, author, isbn, total_copies, available_copies";

/// How a search term is matched against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SearchMode {
    Title,
    Author,
    Isbn,
    /// Title OR author, partial and case-insensitive. Unknown `by`
    /// parameters land here.
    AnyField,
}

impl SearchMode {
    #[must_use]
    pub fn from_param(raw: &str) -> Self {
        match raw {
            "title" => Self::Title,
            "author" => Self::Author,
            "isbn" => Self::Isbn,
            _ => Self::AnyField,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub search: Option<(String, SearchMode)>,
    pub after_id: Option<i64>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InsertOutcome {
    Inserted(Book),
    /// The ISBN was already cataloged; the stored row is returned
    /// unchanged and the catalog add reports success.
    AlreadyCataloged(Book),
}

impl InsertOutcome {
    #[must_use]
    pub fn book(&self) -> &Book {
        match self {
            Self::Inserted(book) | Self::AlreadyCataloged(book) => book,
        }
    }
}

pub(crate) fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    let id_raw: i64 = row.get(0)?;
    let id = BookId::new(id_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))?;
    let isbn_raw: String = row.get(3)?;
    let isbn = Isbn::parse(&isbn_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(Book::new(
        id,
        row.get(1)?,
        row.get(2)?,
        isbn,
        row.get(4)?,
        row.get(5)?,
    ))
}

impl Store {
    /// Insert a book. A duplicate ISBN does not modify the catalog and
    /// yields the already-stored row.
    pub fn insert_book(&mut self, new: &NewBook) -> Result<InsertOutcome, StoreError> {
        let tx = self.conn.transaction()?;
        let existing = tx
            .query_row(
                &format!("SELECT {BOOK_COLUMNS} FROM books WHERE isbn = ?1"),
                params![new.isbn.as_str()],
                book_from_row,
            )
            .optional()?;
        if let Some(book) = existing {
            return Ok(InsertOutcome::AlreadyCataloged(book));
        }
        tx.execute(
            "INSERT INTO books (title, author, title_normalized, author_normalized, isbn,
                                total_copies, available_copies)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                new.title,
                new.author,
                new.title.to_lowercase(),
                new.author.to_lowercase(),
                new.isbn.as_str(),
                new.total_copies,
            ],
        )?;
        let id = tx.last_insert_rowid();
        let book = tx.query_row(
            &format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"),
            params![id],
            book_from_row,
        )?;
        Store::bump_revision(&tx)?;
        tx.commit()?;
        Ok(InsertOutcome::Inserted(book))
    }

    pub fn book_by_id(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"),
                params![id.get()],
                book_from_row,
            )
            .optional()?)
    }

    pub fn book_by_isbn(&self, isbn: &Isbn) -> Result<Option<Book>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {BOOK_COLUMNS} FROM books WHERE isbn = ?1"),
                params![isbn.as_str()],
                book_from_row,
            )
            .optional()?)
    }

    /// Catalog page ordered by id, optionally filtered by a search
    /// term. Fetches one row past the limit to detect a further page.
    /// A blank search term matches nothing.
    pub fn query_books(&self, query: &CatalogQuery) -> Result<BookPage, StoreError> {
        let mut sql = format!("SELECT {BOOK_COLUMNS} FROM books");
        let mut clauses: Vec<String> = Vec::new();
        let mut params_vec: Vec<rusqlite::types::Value> = Vec::new();

        if let Some((term, mode)) = &query.search {
            let term = term.trim();
            if term.is_empty() {
                return Ok(BookPage {
                    books: Vec::new(),
                    has_more: false,
                });
            }
            let needle = format!("%{}%", term.to_lowercase());
            match mode {
                SearchMode::Title => {
                    clauses.push(format!("title_normalized LIKE ?{}", params_vec.len() + 1));
                    params_vec.push(needle.into());
                }
                SearchMode::Author => {
                    clauses.push(format!("author_normalized LIKE ?{}", params_vec.len() + 1));
                    params_vec.push(needle.into());
                }
                SearchMode::Isbn => {
                    clauses.push(format!("isbn = ?{}", params_vec.len() + 1));
                    params_vec.push(term.to_string().into());
                }
                SearchMode::AnyField => {
                    clauses.push(format!(
                        "(title_normalized LIKE ?{n} OR author_normalized LIKE ?{n})",
                        n = params_vec.len() + 1
                    ));
                    params_vec.push(needle.into());
                }
            }
        }
        if let Some(after) = query.after_id {
            clauses.push(format!("id > ?{}", params_vec.len() + 1));
            params_vec.push(after.into());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY id LIMIT ?{}", params_vec.len() + 1));
        params_vec.push(((query.limit as i64) + 1).into());

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut books: Vec<Book> = stmt
            .query_map(rusqlite::params_from_iter(params_vec.iter()), book_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        let has_more = books.len() > query.limit;
        if has_more {
            books.truncate(query.limit);
        }
        Ok(BookPage { books, has_more })
    }
}
