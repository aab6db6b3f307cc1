// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDate;
use libris_model::{
    format_dollars, Book, BookId, FeeSchedule, Isbn, Loan, NewBook, PatronId, TransactionId,
    AUTHOR_MAX_LEN, ISBN_LEN, LOAN_PERIOD_DAYS, MAX_ACTIVE_LOANS, PATRON_ID_LEN, TITLE_MAX_LEN,
};

#[test]
fn identifier_parsing_rejects_hidden_trimming() {
    assert!(PatronId::parse("123456").is_ok());
    assert!(PatronId::parse(" 23456").is_err());
    assert!(PatronId::parse("123456 ").is_err());
    assert!(Isbn::parse("9781593278281").is_ok());
    assert!(Isbn::parse(" 781593278281").is_err());
}

#[test]
fn limits_match_circulation_policy() {
    assert_eq!(TITLE_MAX_LEN, 200);
    assert_eq!(AUTHOR_MAX_LEN, 100);
    assert_eq!(ISBN_LEN, 13);
    assert_eq!(PATRON_ID_LEN, 6);
    assert_eq!(LOAN_PERIOD_DAYS, 14);
    assert_eq!(MAX_ACTIVE_LOANS, 5);
}

#[test]
fn serde_shapes_are_transparent_for_identifiers() {
    let patron = PatronId::parse("123456").expect("patron");
    assert_eq!(
        serde_json::to_string(&patron).expect("serialize"),
        "\"123456\""
    );
    let back: PatronId = serde_json::from_str("\"123456\"").expect("deserialize");
    assert_eq!(back, patron);

    let id = BookId::new(42).expect("book id");
    assert_eq!(serde_json::to_string(&id).expect("serialize"), "42");
}

#[test]
fn book_round_trips_through_json() {
    let book = Book::new(
        BookId::new(7).expect("id"),
        "The Rust Programming Language".to_string(),
        "Klabnik and Nichols".to_string(),
        Isbn::parse("9781593278281").expect("isbn"),
        4,
        2,
    );
    book.validate().expect("valid book");
    let raw = serde_json::to_string(&book).expect("serialize");
    let back: Book = serde_json::from_str(&raw).expect("deserialize");
    assert_eq!(back, book);
}

#[test]
fn new_book_validation_matches_catalog_rules() {
    let isbn = Isbn::parse("9781593278281").expect("isbn");
    assert!(NewBook::new("Title", "Author", isbn.clone(), 1).is_ok());
    assert!(NewBook::new("", "Author", isbn.clone(), 1).is_err());
    assert!(NewBook::new("Title", "Author", isbn, 0).is_err());
}

#[test]
fn end_to_end_fee_for_a_late_return() {
    let borrowed = NaiveDate::from_ymd_opt(2024, 1, 2).expect("date");
    let mut loan = Loan::open(
        PatronId::parse("654321").expect("patron"),
        BookId::new(3).expect("book"),
        borrowed,
    );
    // due 2024-01-16, returned 2024-01-26: ten days late
    loan.returned_on = NaiveDate::from_ymd_opt(2024, 1, 26);
    let days = loan.days_overdue(NaiveDate::from_ymd_opt(2024, 2, 1).expect("date"));
    assert_eq!(days, 10);
    let fee = FeeSchedule::default().fee_cents(days);
    assert_eq!(fee, 650);
    assert_eq!(format_dollars(fee), "$6.50");
}

#[test]
fn transaction_id_canonical_form() {
    let patron = PatronId::parse("111111").expect("patron");
    let txn = TransactionId::issue(&patron, 1_700_000_000);
    assert_eq!(txn.as_str(), "txn_111111_1700000000");
    assert_eq!(
        TransactionId::parse(txn.as_str()).expect("reparse"),
        txn
    );
}
