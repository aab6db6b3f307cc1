// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDate;
use libris_model::{Book, Loan};
use serde::{Deserialize, Serialize};

/// Catalog insert payload. Field-level validation happens against the
/// model's parsers in the handler; this is only the wire shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AddBookRequest {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub total_copies: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BorrowRequest {
    pub patron_id: String,
    pub book_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReturnRequest {
    pub patron_id: String,
    pub book_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PayFeesRequest {
    pub patron_id: String,
    pub book_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RefundRequest {
    pub transaction_id: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoanDto {
    pub book_id: i64,
    pub title: String,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
    pub returned_on: Option<NaiveDate>,
}

impl LoanDto {
    #[must_use]
    pub fn from_loan(loan: &Loan, title: &str) -> Self {
        Self {
            book_id: loan.book_id.get(),
            title: title.to_string(),
            borrowed_on: loan.borrowed_on,
            due_on: loan.due_on,
            returned_on: loan.returned_on,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ActiveLoanDto {
    pub book_id: i64,
    pub title: String,
    pub due_on: NaiveDate,
    pub days_overdue: u32,
    pub fee_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReturnOutcomeDto {
    pub book: Book,
    pub returned_on: NaiveDate,
    pub days_overdue: u32,
    pub fee_cents: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FeeDto {
    pub patron_id: String,
    pub book_id: i64,
    pub fee_cents: i64,
    pub days_overdue: u32,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PatronReportDto {
    pub patron_id: String,
    pub currently_borrowed: Vec<ActiveLoanDto>,
    pub num_currently_borrowed: usize,
    pub total_fees_owed_cents: i64,
    pub history: Vec<LoanDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PaymentDto {
    pub transaction_id: String,
    pub amount_cents: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PaymentStatusDto {
    pub transaction_id: String,
    pub status: String,
    pub amount_cents: Option<i64>,
    pub unix_timestamp: Option<i64>,
}
