// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

pub const FEE_CAP_CENTS: i64 = 1500;

/// Overdue fee policy. Amounts are integer cents; dollars exist only at
/// the presentation edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct FeeSchedule {
    pub first_week_daily_cents: i64,
    pub later_daily_cents: i64,
    pub cap_cents: i64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            first_week_daily_cents: 50,
            later_daily_cents: 100,
            cap_cents: FEE_CAP_CENTS,
        }
    }
}

impl FeeSchedule {
    /// Fee owed after `days_overdue` days: the first seven days accrue
    /// at the first-week rate, later days at the higher rate, and the
    /// total is capped.
    #[must_use]
    pub fn fee_cents(&self, days_overdue: u32) -> i64 {
        if days_overdue == 0 {
            return 0;
        }
        let days = i64::from(days_overdue);
        let first = days.min(7) * self.first_week_daily_cents;
        let rest = (days - 7).max(0) * self.later_daily_cents;
        (first + rest).min(self.cap_cents)
    }
}

/// Render cents as a dollar string for human-facing messages.
#[must_use]
pub fn format_dollars(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}
