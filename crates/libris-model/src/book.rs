// SPDX-License-Identifier: Apache-2.0

use crate::ids::{BookId, Isbn, ParseError};
use serde::{Deserialize, Serialize};

pub const TITLE_MAX_LEN: usize = 200;
pub const AUTHOR_MAX_LEN: usize = 100;

/// A stored catalog row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: Isbn,
    pub total_copies: u32,
    pub available_copies: u32,
}

impl Book {
    #[must_use]
    pub fn new(
        id: BookId,
        title: String,
        author: String,
        isbn: Isbn,
        total_copies: u32,
        available_copies: u32,
    ) -> Self {
        Self {
            id,
            title,
            author,
            isbn,
            total_copies,
            available_copies,
        }
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        if self.total_copies == 0 {
            return Err(ParseError::InvalidFormat("total_copies must be >= 1"));
        }
        if self.available_copies > self.total_copies {
            return Err(ParseError::InvalidFormat(
                "available_copies must not exceed total_copies",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn has_available_copy(&self) -> bool {
        self.available_copies > 0
    }
}

/// Validated payload for a catalog insert. Title and author are trimmed
/// on construction; identifiers are never trimmed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: Isbn,
    pub total_copies: u32,
}

impl NewBook {
    pub fn new(
        title: &str,
        author: &str,
        isbn: Isbn,
        total_copies: u32,
    ) -> Result<Self, ParseError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ParseError::Empty("title"));
        }
        if title.len() > TITLE_MAX_LEN {
            return Err(ParseError::InvalidFormat("title exceeds 200 characters"));
        }
        let author = author.trim();
        if author.is_empty() {
            return Err(ParseError::Empty("author"));
        }
        if author.len() > AUTHOR_MAX_LEN {
            return Err(ParseError::InvalidFormat("author exceeds 100 characters"));
        }
        if total_copies == 0 {
            return Err(ParseError::InvalidFormat("total_copies must be >= 1"));
        }
        Ok(Self {
            title: title.to_string(),
            author: author.to_string(),
            isbn,
            total_copies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn isbn() -> Isbn {
        Isbn::parse("1234567890123").expect("isbn")
    }

    #[test]
    fn new_book_trims_title_and_author() {
        let book = NewBook::new("  Clean Code ", " Robert C. Martin ", isbn(), 3).expect("book");
        assert_eq!(book.title, "Clean Code");
        assert_eq!(book.author, "Robert C. Martin");
    }

    #[test]
    fn new_book_rejects_blank_and_oversized_fields() {
        assert!(NewBook::new("", "Author", isbn(), 1).is_err());
        assert!(NewBook::new("   ", "Author", isbn(), 1).is_err());
        assert!(NewBook::new(&"A".repeat(201), "Author", isbn(), 1).is_err());
        assert!(NewBook::new("Title", "", isbn(), 1).is_err());
        assert!(NewBook::new("Title", &"A".repeat(101), isbn(), 1).is_err());
        assert!(NewBook::new("Title", "Author", isbn(), 0).is_err());
        assert!(NewBook::new(&"A".repeat(200), &"B".repeat(100), isbn(), 1).is_ok());
    }

    #[test]
    fn book_availability_invariant() {
        let book = Book {
            id: BookId::new(1).expect("id"),
            title: "X".to_string(),
            author: "Y".to_string(),
            isbn: isbn(),
            total_copies: 2,
            available_copies: 3,
        };
        assert!(book.validate().is_err());
    }
}
