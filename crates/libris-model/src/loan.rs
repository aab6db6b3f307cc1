// SPDX-License-Identifier: Apache-2.0

use crate::ids::{BookId, PatronId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const LOAN_PERIOD_DAYS: i64 = 14;
pub const MAX_ACTIVE_LOANS: u32 = 5;

/// One borrow of one copy by one patron. A loan with no `returned_on`
/// is active and counts toward the patron's loan limit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct Loan {
    pub patron_id: PatronId,
    pub book_id: BookId,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
    pub returned_on: Option<NaiveDate>,
}

impl Loan {
    #[must_use]
    pub fn open(patron_id: PatronId, book_id: BookId, borrowed_on: NaiveDate) -> Self {
        Self {
            patron_id,
            book_id,
            borrowed_on,
            due_on: borrowed_on + chrono::Duration::days(LOAN_PERIOD_DAYS),
            returned_on: None,
        }
    }

    #[must_use]
    pub fn from_parts(
        patron_id: PatronId,
        book_id: BookId,
        borrowed_on: NaiveDate,
        due_on: NaiveDate,
        returned_on: Option<NaiveDate>,
    ) -> Self {
        Self {
            patron_id,
            book_id,
            borrowed_on,
            due_on,
            returned_on,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.returned_on.is_none()
    }

    /// Days past due. Returned loans are measured against the return
    /// date; active loans against `as_of`. Never negative.
    #[must_use]
    pub fn days_overdue(&self, as_of: NaiveDate) -> u32 {
        let measured = self.returned_on.unwrap_or(as_of);
        let days = (measured - self.due_on).num_days();
        u32::try_from(days.max(0)).unwrap_or(u32::MAX)
    }
}
