// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDate;
use libris_model::{BookId, Isbn, NewBook, PatronId, MAX_ACTIVE_LOANS};
use libris_store::{CatalogQuery, InsertOutcome, SearchMode, Store, StoreError};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("date")
}

fn patron(raw: &str) -> PatronId {
    PatronId::parse(raw).expect("patron")
}

fn seed_book(store: &mut Store, title: &str, author: &str, isbn: &str, copies: u32) -> BookId {
    let new = NewBook::new(
        title,
        author,
        Isbn::parse(isbn).expect("isbn"),
        copies,
    )
    .expect("new book");
    match store.insert_book(&new).expect("insert") {
        InsertOutcome::Inserted(book) => book.id,
        InsertOutcome::AlreadyCataloged(book) => book.id,
        _ => unreachable!(),
    }
}

#[test]
fn insert_is_idempotent_on_isbn() {
    let mut store = Store::open_in_memory().expect("store");
    let first = seed_book(&mut store, "Clean Code", "Robert C. Martin", "9780132350884", 3);
    let again = NewBook::new(
        "Clean Code Second Copy Batch",
        "Someone Else",
        Isbn::parse("9780132350884").expect("isbn"),
        9,
    )
    .expect("new book");
    match store.insert_book(&again).expect("insert") {
        InsertOutcome::AlreadyCataloged(book) => {
            assert_eq!(book.id, first);
            assert_eq!(book.title, "Clean Code");
            assert_eq!(book.total_copies, 3);
        }
        InsertOutcome::Inserted(_) => panic!("duplicate isbn must not insert"),
        _ => unreachable!(),
    }
}

#[test]
fn lookup_by_isbn_finds_the_stored_row() {
    let mut store = Store::open_in_memory().expect("store");
    let id = seed_book(&mut store, "Clean Code", "Robert C. Martin", "9780132350884", 3);
    let found = store
        .book_by_isbn(&Isbn::parse("9780132350884").expect("isbn"))
        .expect("lookup")
        .expect("present");
    assert_eq!(found.id, id);
    assert!(store
        .book_by_isbn(&Isbn::parse("9999999999999").expect("isbn"))
        .expect("lookup")
        .is_none());
}

#[test]
fn open_on_disk_persists_between_connections() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("libris.sqlite");
    let id = {
        let mut store = Store::open(&path).expect("store");
        seed_book(&mut store, "Refactoring", "Martin Fowler", "9780201485677", 2)
    };
    let store = Store::open(&path).expect("reopen");
    store.probe().expect("probe");
    let book = store.book_by_id(id).expect("lookup").expect("present");
    assert_eq!(book.title, "Refactoring");
}

#[test]
fn borrow_decrements_availability_and_sets_due_date() {
    let mut store = Store::open_in_memory().expect("store");
    let id = seed_book(&mut store, "Refactoring", "Martin Fowler", "9780201485677", 2);
    let loan = store
        .create_loan(&patron("123456"), id, date(2024, 3, 1))
        .expect("borrow");
    assert_eq!(loan.due_on, date(2024, 3, 15));
    let book = store.book_by_id(id).expect("lookup").expect("present");
    assert_eq!(book.available_copies, 1);
}

#[test]
fn borrow_rejects_missing_and_exhausted_books() {
    let mut store = Store::open_in_memory().expect("store");
    let missing = BookId::new(999).expect("id");
    assert_eq!(
        store.create_loan(&patron("123456"), missing, date(2024, 3, 1)),
        Err(StoreError::BookMissing)
    );
    let id = seed_book(&mut store, "Slim Volume", "A. Author", "9780000000001", 1);
    store
        .create_loan(&patron("111111"), id, date(2024, 3, 1))
        .expect("first borrow");
    assert_eq!(
        store.create_loan(&patron("222222"), id, date(2024, 3, 1)),
        Err(StoreError::NoAvailableCopy)
    );
}

#[test]
fn loan_limit_blocks_the_sixth_borrow() {
    let mut store = Store::open_in_memory().expect("store");
    let borrower = patron("333333");
    for n in 0..=u64::from(MAX_ACTIVE_LOANS) {
        let isbn = format!("97800000001{n:02}");
        let id = seed_book(&mut store, &format!("Volume {n}"), "Prolific", &isbn, 1);
        let result = store.create_loan(&borrower, id, date(2024, 3, 1));
        if n < u64::from(MAX_ACTIVE_LOANS) {
            result.expect("within limit");
        } else {
            assert_eq!(result, Err(StoreError::LoanLimitReached));
        }
    }
    assert_eq!(store.active_loan_count(&borrower).expect("count"), 5);
}

#[test]
fn return_closes_the_loan_and_restores_availability() {
    let mut store = Store::open_in_memory().expect("store");
    let id = seed_book(&mut store, "Refactoring", "Martin Fowler", "9780201485677", 2);
    let borrower = patron("123456");
    store
        .create_loan(&borrower, id, date(2024, 3, 1))
        .expect("borrow");
    let closed = store
        .close_loan(&borrower, id, date(2024, 3, 20))
        .expect("return");
    assert_eq!(closed.returned_on, Some(date(2024, 3, 20)));
    let book = store.book_by_id(id).expect("lookup").expect("present");
    assert_eq!(book.available_copies, 2);
    // the loan is closed, so the count drops back
    assert_eq!(store.active_loan_count(&borrower).expect("count"), 0);
}

#[test]
fn return_without_active_loan_is_rejected() {
    let mut store = Store::open_in_memory().expect("store");
    let id = seed_book(&mut store, "Refactoring", "Martin Fowler", "9780201485677", 2);
    assert_eq!(
        store.close_loan(&patron("123456"), id, date(2024, 3, 20)),
        Err(StoreError::NoActiveLoan)
    );
    let missing = BookId::new(999).expect("id");
    assert_eq!(
        store.close_loan(&patron("123456"), missing, date(2024, 3, 20)),
        Err(StoreError::BookMissing)
    );
}

#[test]
fn availability_never_exceeds_total_on_double_return() {
    let mut store = Store::open_in_memory().expect("store");
    let id = seed_book(&mut store, "Popular", "B. Author", "9780000000002", 1);
    let first = patron("111111");
    let second = patron("222222");
    store.create_loan(&first, id, date(2024, 3, 1)).expect("borrow");
    store.close_loan(&first, id, date(2024, 3, 2)).expect("return");
    // availability is back at total; a stale second return attempt for a
    // different patron has no active loan to close
    assert_eq!(
        store.close_loan(&second, id, date(2024, 3, 3)),
        Err(StoreError::NoActiveLoan)
    );
    let book = store.book_by_id(id).expect("lookup").expect("present");
    assert_eq!(book.available_copies, 1);
}

#[test]
fn latest_loan_reports_the_most_recent_borrow() {
    let mut store = Store::open_in_memory().expect("store");
    let id = seed_book(&mut store, "Cycled", "C. Author", "9780000000003", 1);
    let borrower = patron("123456");
    store.create_loan(&borrower, id, date(2024, 1, 1)).expect("borrow");
    store.close_loan(&borrower, id, date(2024, 1, 5)).expect("return");
    store.create_loan(&borrower, id, date(2024, 2, 1)).expect("borrow again");
    let latest = store
        .latest_loan(&borrower, id)
        .expect("query")
        .expect("present");
    assert_eq!(latest.borrowed_on, date(2024, 2, 1));
    assert!(latest.is_active());
}

#[test]
fn search_modes_match_the_catalog_rules() {
    let mut store = Store::open_in_memory().expect("store");
    seed_book(&mut store, "Clean Code", "Robert C. Martin", "9780132350884", 1);
    seed_book(&mut store, "Design Patterns", "Gamma et al.", "9780201633610", 1);

    let by_title = store
        .query_books(&CatalogQuery {
            search: Some(("code".to_string(), SearchMode::Title)),
            after_id: None,
            limit: 50,
        })
        .expect("search");
    assert_eq!(by_title.books.len(), 1);
    assert_eq!(by_title.books[0].title, "Clean Code");

    let by_author = store
        .query_books(&CatalogQuery {
            search: Some(("MARTIN".to_string(), SearchMode::Author)),
            after_id: None,
            limit: 50,
        })
        .expect("search");
    assert_eq!(by_author.books.len(), 1);

    let by_isbn = store
        .query_books(&CatalogQuery {
            search: Some(("9780201633610".to_string(), SearchMode::Isbn)),
            after_id: None,
            limit: 50,
        })
        .expect("search");
    assert_eq!(by_isbn.books.len(), 1);
    assert_eq!(by_isbn.books[0].title, "Design Patterns");

    // partial isbn must not match: isbn search is exact
    let partial_isbn = store
        .query_books(&CatalogQuery {
            search: Some(("9780201".to_string(), SearchMode::Isbn)),
            after_id: None,
            limit: 50,
        })
        .expect("search");
    assert!(partial_isbn.books.is_empty());

    let fallback = store
        .query_books(&CatalogQuery {
            search: Some(("martin".to_string(), SearchMode::AnyField)),
            after_id: None,
            limit: 50,
        })
        .expect("search");
    assert_eq!(fallback.books.len(), 1);

    let blank = store
        .query_books(&CatalogQuery {
            search: Some(("   ".to_string(), SearchMode::Title)),
            after_id: None,
            limit: 50,
        })
        .expect("search");
    assert!(blank.books.is_empty());
}

#[test]
fn keyset_pagination_walks_the_catalog_in_order() {
    let mut store = Store::open_in_memory().expect("store");
    for n in 0..5 {
        let isbn = format!("97800000002{n:02}");
        seed_book(&mut store, &format!("Volume {n}"), "Paged", &isbn, 1);
    }
    let first = store
        .query_books(&CatalogQuery {
            search: None,
            after_id: None,
            limit: 2,
        })
        .expect("page");
    assert_eq!(first.books.len(), 2);
    assert!(first.has_more);

    let last_id = first.books[1].id.get();
    let second = store
        .query_books(&CatalogQuery {
            search: None,
            after_id: Some(last_id),
            limit: 2,
        })
        .expect("page");
    assert_eq!(second.books.len(), 2);
    assert!(second.books[0].id.get() > last_id);

    let third = store
        .query_books(&CatalogQuery {
            search: None,
            after_id: Some(second.books[1].id.get()),
            limit: 2,
        })
        .expect("page");
    assert_eq!(third.books.len(), 1);
    assert!(!third.has_more);
}

#[test]
fn patron_history_includes_returned_and_active_loans() {
    let mut store = Store::open_in_memory().expect("store");
    let a = seed_book(&mut store, "First", "Author", "9780000000011", 1);
    let b = seed_book(&mut store, "Second", "Author", "9780000000012", 1);
    let borrower = patron("123456");
    store.create_loan(&borrower, a, date(2024, 1, 1)).expect("borrow a");
    store.close_loan(&borrower, a, date(2024, 1, 10)).expect("return a");
    store.create_loan(&borrower, b, date(2024, 2, 1)).expect("borrow b");

    let active = store.active_loans(&borrower).expect("active");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].title, "Second");

    let history = store.loan_history(&borrower).expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].title, "First");
    assert!(!history[0].loan.is_active());
}

#[test]
fn revision_moves_on_every_mutation() {
    let mut store = Store::open_in_memory().expect("store");
    let r0 = store.catalog_revision().expect("revision");
    let id = seed_book(&mut store, "Counted", "Author", "9780000000021", 1);
    let r1 = store.catalog_revision().expect("revision");
    assert!(r1 > r0);
    store
        .create_loan(&patron("123456"), id, date(2024, 3, 1))
        .expect("borrow");
    let r2 = store.catalog_revision().expect("revision");
    assert!(r2 > r1);
}
