// SPDX-License-Identifier: Apache-2.0

use crate::catalog::book_from_row;
use crate::{Store, StoreError};
use chrono::NaiveDate;
use libris_model::{Book, BookId, Loan, PatronId, MAX_ACTIVE_LOANS};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

const LOAN_COLUMNS: &str = "patron_id, book_id, borrowed_on, due_on, returned_on";

/// A loan joined with its book title, as reported to patrons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatronLoanRow {
    pub loan: Loan,
    pub title: String,
}

fn loan_from_row(row: &Row<'_>) -> rusqlite::Result<Loan> {
    let patron_raw: String = row.get(0)?;
    let patron = PatronId::parse(&patron_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
    let book_raw: i64 = row.get(1)?;
    let book = BookId::new(book_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Integer, Box::new(e)))?;
    Ok(Loan::from_parts(
        patron,
        book,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn patron_loan_from_row(row: &Row<'_>) -> rusqlite::Result<PatronLoanRow> {
    let loan = loan_from_row(row)?;
    Ok(PatronLoanRow {
        loan,
        title: row.get(5)?,
    })
}

impl Store {
    pub fn active_loan_count(&self, patron: &PatronId) -> Result<u32, StoreError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM loans WHERE patron_id = ?1 AND returned_on IS NULL",
            params![patron.as_str()],
            |row| row.get(0),
        )?)
    }

    /// Borrow one copy. Availability and the patron's loan limit are
    /// checked inside the transaction that records the loan.
    pub fn create_loan(
        &mut self,
        patron: &PatronId,
        book_id: BookId,
        borrowed_on: NaiveDate,
    ) -> Result<Loan, StoreError> {
        let tx = self.conn.transaction()?;
        let book: Option<Book> = tx
            .query_row(
                "SELECT id, title, author, isbn, total_copies, available_copies
                 FROM books WHERE id = ?1",
                params![book_id.get()],
                book_from_row,
            )
            .optional()?;
        let book = book.ok_or(StoreError::BookMissing)?;
        if !book.has_available_copy() {
            return Err(StoreError::NoAvailableCopy);
        }
        let active: u32 = tx.query_row(
            "SELECT COUNT(*) FROM loans WHERE patron_id = ?1 AND returned_on IS NULL",
            params![patron.as_str()],
            |row| row.get(0),
        )?;
        if active >= MAX_ACTIVE_LOANS {
            return Err(StoreError::LoanLimitReached);
        }
        let loan = Loan::open(patron.clone(), book_id, borrowed_on);
        tx.execute(
            "INSERT INTO loans (patron_id, book_id, borrowed_on, due_on, returned_on)
             VALUES (?1, ?2, ?3, ?4, NULL)",
            params![patron.as_str(), book_id.get(), loan.borrowed_on, loan.due_on],
        )?;
        tx.execute(
            "UPDATE books SET available_copies = available_copies - 1 WHERE id = ?1",
            params![book_id.get()],
        )?;
        Store::bump_revision(&tx)?;
        tx.commit()?;
        Ok(loan)
    }

    /// Return a copy. Stamps the oldest active loan for the pair and
    /// increments availability, clamped so it never exceeds the total.
    pub fn close_loan(
        &mut self,
        patron: &PatronId,
        book_id: BookId,
        returned_on: NaiveDate,
    ) -> Result<Loan, StoreError> {
        let tx = self.conn.transaction()?;
        let book_exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM books WHERE id = ?1",
                params![book_id.get()],
                |row| row.get(0),
            )
            .optional()?;
        if book_exists.is_none() {
            return Err(StoreError::BookMissing);
        }
        let loan_id: Option<i64> = tx
            .query_row(
                "SELECT id FROM loans
                 WHERE patron_id = ?1 AND book_id = ?2 AND returned_on IS NULL
                 ORDER BY id LIMIT 1",
                params![patron.as_str(), book_id.get()],
                |row| row.get(0),
            )
            .optional()?;
        let loan_id = loan_id.ok_or(StoreError::NoActiveLoan)?;
        tx.execute(
            "UPDATE loans SET returned_on = ?1 WHERE id = ?2",
            params![returned_on, loan_id],
        )?;
        tx.execute(
            "UPDATE books
             SET available_copies = MIN(available_copies + 1, total_copies)
             WHERE id = ?1",
            params![book_id.get()],
        )?;
        let loan = tx.query_row(
            &format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = ?1"),
            params![loan_id],
            loan_from_row,
        )?;
        Store::bump_revision(&tx)?;
        tx.commit()?;
        Ok(loan)
    }

    /// Most recent loan for the pair, returned or not. Fee inquiries on
    /// already-returned loans read their historical fee through this.
    pub fn latest_loan(
        &self,
        patron: &PatronId,
        book_id: BookId,
    ) -> Result<Option<Loan>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {LOAN_COLUMNS} FROM loans
                     WHERE patron_id = ?1 AND book_id = ?2
                     ORDER BY id DESC LIMIT 1"
                ),
                params![patron.as_str(), book_id.get()],
                loan_from_row,
            )
            .optional()?)
    }

    pub fn active_loans(&self, patron: &PatronId) -> Result<Vec<PatronLoanRow>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT l.patron_id, l.book_id, l.borrowed_on, l.due_on, l.returned_on, b.title
             FROM loans l JOIN books b ON b.id = l.book_id
             WHERE l.patron_id = ?1 AND l.returned_on IS NULL
             ORDER BY l.id",
        )?;
        let rows = stmt
            .query_map(params![patron.as_str()], patron_loan_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn loan_history(&self, patron: &PatronId) -> Result<Vec<PatronLoanRow>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT l.patron_id, l.book_id, l.borrowed_on, l.due_on, l.returned_on, b.title
             FROM loans l JOIN books b ON b.id = l.book_id
             WHERE l.patron_id = ?1
             ORDER BY l.id",
        )?;
        let rows = stmt
            .query_map(params![patron.as_str()], patron_loan_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
