// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use libris_model::{PatronId, TransactionId};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// Single-transaction charge ceiling, in cents.
pub const CHARGE_LIMIT_CENTS: i64 = 100_000;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PaymentError {
    InvalidAmount(String),
    AmountOverLimit,
    Declined(String),
    Provider(String),
}

impl Display for PaymentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAmount(msg) => write!(f, "invalid amount: {msg}"),
            Self::AmountOverLimit => f.write_str("amount exceeds the single-transaction limit"),
            Self::Declined(msg) => write!(f, "payment declined: {msg}"),
            Self::Provider(msg) => write!(f, "payment provider error: {msg}"),
        }
    }
}

impl std::error::Error for PaymentError {}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PaymentStatus {
    Completed {
        amount_cents: i64,
        unix_timestamp: i64,
    },
    NotFound,
}

/// Seam to the payment network. The simulated provider below is the
/// default; deployments wire a real one through `AppState`.
#[async_trait]
pub trait PaymentProvider: Send + Sync + 'static {
    async fn charge(
        &self,
        patron: &PatronId,
        amount_cents: i64,
        description: &str,
    ) -> Result<TransactionId, PaymentError>;

    async fn refund(&self, txn: &TransactionId, amount_cents: i64) -> Result<(), PaymentError>;

    async fn status(&self, reference: &str) -> PaymentStatus;
}

#[derive(Debug, Clone)]
struct RecordedCharge {
    amount_cents: i64,
    unix_timestamp: i64,
}

/// In-process provider. Issues `txn_<patron>_<unix-seconds>` references
/// and remembers every charge so status lookups answer truthfully.
#[derive(Default)]
pub struct SimulatedProvider {
    charges: Mutex<HashMap<String, RecordedCharge>>,
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}

#[async_trait]
impl PaymentProvider for SimulatedProvider {
    async fn charge(
        &self,
        patron: &PatronId,
        amount_cents: i64,
        description: &str,
    ) -> Result<TransactionId, PaymentError> {
        if amount_cents <= 0 {
            return Err(PaymentError::InvalidAmount(
                "charge amount must be greater than 0".to_string(),
            ));
        }
        if amount_cents > CHARGE_LIMIT_CENTS {
            return Err(PaymentError::AmountOverLimit);
        }
        let mut charges = self.charges.lock().await;
        let mut stamp = unix_now();
        // two charges for one patron within a second get distinct refs
        let txn = loop {
            let candidate = TransactionId::issue(patron, stamp);
            if !charges.contains_key(candidate.as_str()) {
                break candidate;
            }
            stamp += 1;
        };
        tracing::info!(
            txn = %txn,
            amount_cents,
            description,
            "simulated charge accepted"
        );
        charges.insert(
            txn.as_str().to_string(),
            RecordedCharge {
                amount_cents,
                unix_timestamp: stamp,
            },
        );
        Ok(txn)
    }

    async fn refund(&self, txn: &TransactionId, amount_cents: i64) -> Result<(), PaymentError> {
        if amount_cents <= 0 {
            return Err(PaymentError::InvalidAmount(
                "refund amount must be greater than 0".to_string(),
            ));
        }
        tracing::info!(txn = %txn, amount_cents, "simulated refund accepted");
        Ok(())
    }

    async fn status(&self, reference: &str) -> PaymentStatus {
        match self.charges.lock().await.get(reference) {
            Some(charge) => PaymentStatus::Completed {
                amount_cents: charge.amount_cents,
                unix_timestamp: charge.unix_timestamp,
            },
            None => PaymentStatus::NotFound,
        }
    }
}
