// SPDX-License-Identifier: Apache-2.0

use super::*;
use axum::extract::{Path, Query};
use libris_api::{
    ActiveLoanDto, BorrowRequest, FeeDto, LoanDto, PatronReportDto, ReturnOutcomeDto,
    ReturnRequest,
};
use libris_model::{format_dollars, BookId, PatronId};
use std::collections::BTreeMap;
use tracing::info;

const ROUTE_LOANS: &str = "/v1/loans";
const ROUTE_RETURNS: &str = "/v1/loans/return";
const ROUTE_PATRON: &str = "/v1/patrons/{patron_id}";
const ROUTE_FEES: &str = "/v1/patrons/{patron_id}/fees";

fn parse_patron(raw: &str) -> Result<PatronId, ApiError> {
    PatronId::parse(raw).map_err(|e| param_error("patron_id", raw, &e))
}

fn parse_book_id(raw: i64) -> Result<BookId, ApiError> {
    BookId::new(raw).map_err(|e| param_error("book_id", &raw.to_string(), &e))
}

pub(crate) async fn borrow_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BorrowRequest>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    info!(request_id = %request_id, route = ROUTE_LOANS, "borrow start");
    if let Some(refused) =
        mutation_guard(&state, &headers, ROUTE_LOANS, started, &request_id).await
    {
        return refused;
    }

    let parsed = parse_patron(&req.patron_id).and_then(|patron| {
        parse_book_id(req.book_id).map(|book_id| (patron, book_id))
    });
    let (patron, book_id) = match parsed {
        Ok(pair) => pair,
        Err(err) => {
            let resp = api_error_response(StatusCode::BAD_REQUEST, err);
            state
                .metrics
                .observe_request(ROUTE_LOANS, StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    let borrowed_on = today();
    let outcome = {
        let mut store = state.store.lock().await;
        store.book_by_id(book_id).and_then(|book| match book {
            None => Err(libris_store::StoreError::BookMissing),
            Some(book) => store
                .create_loan(&patron, book_id, borrowed_on)
                .map(|loan| (book, loan)),
        })
    };
    let (book, loan) = match outcome {
        Ok(pair) => pair,
        Err(err) => {
            let (status, body) = store_error_status(&err);
            let resp = api_error_response(status, body);
            state
                .metrics
                .observe_request(ROUTE_LOANS, status, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    info!(
        request_id = %request_id,
        patron = %patron,
        book_id = %book_id,
        due_on = %loan.due_on,
        "loan created"
    );
    let payload = serde_json::json!({
        "loan": LoanDto::from_loan(&loan, &book.title),
        "message": format!(
            "Successfully borrowed \"{}\". Due date: {}.",
            book.title, loan.due_on
        ),
    });
    let resp = json_response(StatusCode::OK, &payload, false);
    state
        .metrics
        .observe_request(ROUTE_LOANS, StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn return_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ReturnRequest>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    info!(request_id = %request_id, route = ROUTE_RETURNS, "return start");
    if let Some(refused) =
        mutation_guard(&state, &headers, ROUTE_RETURNS, started, &request_id).await
    {
        return refused;
    }

    let parsed = parse_patron(&req.patron_id).and_then(|patron| {
        parse_book_id(req.book_id).map(|book_id| (patron, book_id))
    });
    let (patron, book_id) = match parsed {
        Ok(pair) => pair,
        Err(err) => {
            let resp = api_error_response(StatusCode::BAD_REQUEST, err);
            state
                .metrics
                .observe_request(ROUTE_RETURNS, StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    let returned_on = today();
    let outcome = {
        let mut store = state.store.lock().await;
        store
            .close_loan(&patron, book_id, returned_on)
            .and_then(|loan| match store.book_by_id(book_id)? {
                None => Err(libris_store::StoreError::BookMissing),
                Some(book) => Ok((book, loan)),
            })
    };
    let (book, loan) = match outcome {
        Ok(pair) => pair,
        Err(err) => {
            let (status, body) = store_error_status(&err);
            let resp = api_error_response(status, body);
            state
                .metrics
                .observe_request(ROUTE_RETURNS, status, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    let days_overdue = loan.days_overdue(returned_on);
    let fee_cents = state.fee_schedule.fee_cents(days_overdue);
    let message = if days_overdue > 0 && fee_cents > 0 {
        format!(
            "Returned \"{}\". {days_overdue} day(s) overdue. Late fee: {}.",
            book.title,
            format_dollars(fee_cents)
        )
    } else {
        format!("Returned \"{}\" on time. No late fee.", book.title)
    };
    info!(
        request_id = %request_id,
        patron = %patron,
        book_id = %book_id,
        days_overdue,
        fee_cents,
        "loan closed"
    );
    let dto = ReturnOutcomeDto {
        book,
        returned_on,
        days_overdue,
        fee_cents,
        message,
    };
    let resp = json_response(StatusCode::OK, &serde_json::json!(dto), false);
    state
        .metrics
        .observe_request(ROUTE_RETURNS, StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn fee_inquiry_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_patron): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);

    let parsed = parse_patron(&raw_patron).and_then(|patron| {
        let raw = params
            .get("book_id")
            .ok_or_else(|| ApiError::missing_param("book_id"))?;
        let numeric = raw
            .parse::<i64>()
            .map_err(|_| ApiError::invalid_param("book_id", raw))?;
        parse_book_id(numeric).map(|book_id| (patron, book_id))
    });
    let (patron, book_id) = match parsed {
        Ok(pair) => pair,
        Err(err) => {
            let resp = api_error_response(StatusCode::BAD_REQUEST, err);
            state
                .metrics
                .observe_request(ROUTE_FEES, StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    let lookup = {
        let store = state.store.lock().await;
        store.book_by_id(book_id).and_then(|book| match book {
            None => Err(libris_store::StoreError::BookMissing),
            Some(_) => store.latest_loan(&patron, book_id),
        })
    };
    let latest = match lookup {
        Ok(latest) => latest,
        Err(err) => {
            let (status, body) = store_error_status(&err);
            let resp = api_error_response(status, body);
            state
                .metrics
                .observe_request(ROUTE_FEES, status, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    let dto = match latest {
        None => FeeDto {
            patron_id: patron.to_string(),
            book_id: book_id.get(),
            fee_cents: 0,
            days_overdue: 0,
            status: "no loan on record for this patron and book".to_string(),
        },
        Some(loan) => {
            let days_overdue = loan.days_overdue(today());
            let status = if loan.returned_on.is_some() {
                "returned; fee assessed as of the return date"
            } else {
                "not yet returned; fee assessed as of today"
            };
            FeeDto {
                patron_id: patron.to_string(),
                book_id: book_id.get(),
                fee_cents: state.fee_schedule.fee_cents(days_overdue),
                days_overdue,
                status: status.to_string(),
            }
        }
    };
    let resp = json_response(StatusCode::OK, &serde_json::json!(dto), false);
    state
        .metrics
        .observe_request(ROUTE_FEES, StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn patron_report_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_patron): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);

    let patron = match parse_patron(&raw_patron) {
        Ok(patron) => patron,
        Err(err) => {
            let resp = api_error_response(StatusCode::BAD_REQUEST, err);
            state
                .metrics
                .observe_request(ROUTE_PATRON, StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    let rows = {
        let store = state.store.lock().await;
        store
            .active_loans(&patron)
            .and_then(|active| store.loan_history(&patron).map(|history| (active, history)))
    };
    let (active, history) = match rows {
        Ok(pair) => pair,
        Err(err) => {
            let (status, body) = store_error_status(&err);
            let resp = api_error_response(status, body);
            state
                .metrics
                .observe_request(ROUTE_PATRON, status, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    let as_of = today();
    let mut total_fees_owed_cents = 0;
    let currently_borrowed: Vec<ActiveLoanDto> = active
        .iter()
        .map(|row| {
            let days_overdue = row.loan.days_overdue(as_of);
            let fee_cents = state.fee_schedule.fee_cents(days_overdue);
            total_fees_owed_cents += fee_cents;
            ActiveLoanDto {
                book_id: row.loan.book_id.get(),
                title: row.title.clone(),
                due_on: row.loan.due_on,
                days_overdue,
                fee_cents,
            }
        })
        .collect();
    let history: Vec<LoanDto> = history
        .iter()
        .map(|row| LoanDto::from_loan(&row.loan, &row.title))
        .collect();

    let dto = PatronReportDto {
        patron_id: patron.to_string(),
        num_currently_borrowed: currently_borrowed.len(),
        currently_borrowed,
        total_fees_owed_cents,
        history,
    };
    let resp = json_response(StatusCode::OK, &serde_json::json!(dto), false);
    state
        .metrics
        .observe_request(ROUTE_PATRON, StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}
