#![forbid(unsafe_code)]
//! Circulation model SSOT.
//!
//! Identifier parsing, catalog records, loan records, and the overdue
//! fee schedule. Everything here is pure: fee math takes an as-of date
//! from the caller and never reads the wall clock.

mod book;
mod fees;
mod ids;
mod loan;

pub use book::{Book, NewBook, AUTHOR_MAX_LEN, TITLE_MAX_LEN};
pub use fees::{format_dollars, FeeSchedule, FEE_CAP_CENTS};
pub use ids::{
    BookId, Isbn, ParseError, PatronId, TransactionId, ISBN_LEN, PATRON_ID_LEN,
};
pub use loan::{Loan, LOAN_PERIOD_DAYS, MAX_ACTIVE_LOANS};

pub const CRATE_NAME: &str = "libris-model";
