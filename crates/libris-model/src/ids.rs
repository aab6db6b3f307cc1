// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const PATRON_ID_LEN: usize = 6;
pub const ISBN_LEN: usize = 13;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    Empty(&'static str),
    WrongLength(&'static str, usize),
    InvalidFormat(&'static str),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty(name) => write!(f, "{name} must not be empty"),
            Self::WrongLength(name, expected) => {
                write!(f, "{name} must be exactly {expected} characters")
            }
            Self::InvalidFormat(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ParseError {}

/// Library member identifier. Exactly six ASCII digits, no trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct PatronId(String);

impl PatronId {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        if input.is_empty() {
            return Err(ParseError::Empty("patron_id"));
        }
        if input.len() != PATRON_ID_LEN {
            return Err(ParseError::WrongLength("patron_id", PATRON_ID_LEN));
        }
        if !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidFormat("patron_id must be digits only"));
        }
        Ok(Self(input.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PatronId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Thirteen ASCII digits, no separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct Isbn(String);

impl Isbn {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        if input.is_empty() {
            return Err(ParseError::Empty("isbn"));
        }
        if input.len() != ISBN_LEN {
            return Err(ParseError::WrongLength("isbn", ISBN_LEN));
        }
        if !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidFormat("isbn must be digits only"));
        }
        Ok(Self(input.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Isbn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog row identifier. Always positive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord,
)]
#[serde(transparent)]
#[non_exhaustive]
pub struct BookId(i64);

impl BookId {
    pub fn new(raw: i64) -> Result<Self, ParseError> {
        if raw <= 0 {
            return Err(ParseError::InvalidFormat("book_id must be positive"));
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl Display for BookId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payment reference. Canonical form is `txn_<patron>_<unix-seconds>`;
/// parsing only requires the `txn_` prefix so references from older
/// providers remain accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct TransactionId(String);

impl TransactionId {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        if input.is_empty() {
            return Err(ParseError::Empty("transaction_id"));
        }
        let Some(rest) = input.strip_prefix("txn_") else {
            return Err(ParseError::InvalidFormat(
                "transaction_id must start with txn_",
            ));
        };
        if rest.is_empty() {
            return Err(ParseError::InvalidFormat(
                "transaction_id must carry a reference after txn_",
            ));
        }
        Ok(Self(input.to_string()))
    }

    #[must_use]
    pub fn issue(patron: &PatronId, unix_seconds: i64) -> Self {
        Self(format!("txn_{}_{unix_seconds}", patron.as_str()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
