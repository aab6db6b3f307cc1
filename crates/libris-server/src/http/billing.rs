// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::payments::PaymentStatus;
use axum::extract::Path;
use libris_api::{PayFeesRequest, PaymentDto, PaymentStatusDto, RefundRequest};
use libris_model::{format_dollars, BookId, PatronId, TransactionId, FEE_CAP_CENTS};
use tracing::info;

const ROUTE_PAYMENTS: &str = "/v1/payments";
const ROUTE_REFUNDS: &str = "/v1/payments/refund";
const ROUTE_PAYMENT_STATUS: &str = "/v1/payments/{txn_id}";

pub(crate) async fn pay_fees_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PayFeesRequest>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    info!(request_id = %request_id, route = ROUTE_PAYMENTS, "payment start");
    if let Some(refused) =
        mutation_guard(&state, &headers, ROUTE_PAYMENTS, started, &request_id).await
    {
        return refused;
    }

    let parsed = PatronId::parse(&req.patron_id)
        .map_err(|e| param_error("patron_id", &req.patron_id, &e))
        .and_then(|patron| {
            BookId::new(req.book_id)
                .map_err(|e| param_error("book_id", &req.book_id.to_string(), &e))
                .map(|book_id| (patron, book_id))
        });
    let (patron, book_id) = match parsed {
        Ok(pair) => pair,
        Err(err) => {
            let resp = api_error_response(StatusCode::BAD_REQUEST, err);
            state
                .metrics
                .observe_request(ROUTE_PAYMENTS, StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    // Assess the fee before touching the provider; a zero balance or an
    // unknown book never reaches the payment network.
    let assessed = {
        let store = state.store.lock().await;
        store.book_by_id(book_id).and_then(|book| match book {
            None => Err(libris_store::StoreError::BookMissing),
            Some(book) => store
                .latest_loan(&patron, book_id)
                .map(|latest| (book, latest)),
        })
    };
    let (book, latest) = match assessed {
        Ok(pair) => pair,
        Err(err) => {
            let (status, body) = store_error_status(&err);
            let resp = api_error_response(status, body);
            state
                .metrics
                .observe_request(ROUTE_PAYMENTS, status, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };
    let fee_cents = latest
        .map(|loan| state.fee_schedule.fee_cents(loan.days_overdue(today())))
        .unwrap_or(0);
    if fee_cents == 0 {
        let resp = api_error_response(
            StatusCode::CONFLICT,
            error_json(
                ApiErrorCode::Conflict,
                "no late fees owed for this patron and book",
                serde_json::json!({"book_id": book_id.get()}),
            ),
        );
        state
            .metrics
            .observe_request(ROUTE_PAYMENTS, StatusCode::CONFLICT, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    }

    let description = format!("Late fees for '{}'", book.title);
    match state.payments.charge(&patron, fee_cents, &description).await {
        Ok(txn) => {
            info!(request_id = %request_id, txn = %txn, fee_cents, "payment accepted");
            let dto = PaymentDto {
                transaction_id: txn.to_string(),
                amount_cents: fee_cents,
                message: format!(
                    "Payment of {} processed successfully.",
                    format_dollars(fee_cents)
                ),
            };
            let resp = json_response(StatusCode::OK, &serde_json::json!(dto), false);
            state
                .metrics
                .observe_request(ROUTE_PAYMENTS, StatusCode::OK, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
        Err(err) => {
            let resp = api_error_response(
                StatusCode::PAYMENT_REQUIRED,
                error_json(
                    ApiErrorCode::PaymentRejected,
                    &err.to_string(),
                    serde_json::json!({"book_id": book_id.get()}),
                ),
            );
            state
                .metrics
                .observe_request(
                    ROUTE_PAYMENTS,
                    StatusCode::PAYMENT_REQUIRED,
                    started.elapsed(),
                )
                .await;
            with_request_id(resp, &request_id)
        }
    }
}

pub(crate) async fn refund_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RefundRequest>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    info!(request_id = %request_id, route = ROUTE_REFUNDS, "refund start");
    if let Some(refused) =
        mutation_guard(&state, &headers, ROUTE_REFUNDS, started, &request_id).await
    {
        return refused;
    }

    let txn = match TransactionId::parse(&req.transaction_id) {
        Ok(txn) => txn,
        Err(err) => {
            let resp = api_error_response(
                StatusCode::BAD_REQUEST,
                param_error("transaction_id", &req.transaction_id, &err),
            );
            state
                .metrics
                .observe_request(ROUTE_REFUNDS, StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };
    if req.amount_cents <= 0 {
        let resp = api_error_response(
            StatusCode::BAD_REQUEST,
            error_json(
                ApiErrorCode::InvalidParameter,
                "refund amount must be greater than 0",
                serde_json::json!({"amount_cents": req.amount_cents}),
            ),
        );
        state
            .metrics
            .observe_request(ROUTE_REFUNDS, StatusCode::BAD_REQUEST, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    }
    if req.amount_cents > FEE_CAP_CENTS {
        let resp = api_error_response(
            StatusCode::BAD_REQUEST,
            error_json(
                ApiErrorCode::LimitExceeded,
                "refund amount exceeds the late fee cap",
                serde_json::json!({"amount_cents": req.amount_cents, "cap_cents": FEE_CAP_CENTS}),
            ),
        );
        state
            .metrics
            .observe_request(ROUTE_REFUNDS, StatusCode::BAD_REQUEST, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    }

    match state.payments.refund(&txn, req.amount_cents).await {
        Ok(()) => {
            info!(request_id = %request_id, txn = %txn, amount_cents = req.amount_cents, "refund accepted");
            let payload = serde_json::json!({
                "transaction_id": txn.to_string(),
                "amount_cents": req.amount_cents,
                "message": format!(
                    "Refund of {} processed successfully.",
                    format_dollars(req.amount_cents)
                ),
            });
            let resp = json_response(StatusCode::OK, &payload, false);
            state
                .metrics
                .observe_request(ROUTE_REFUNDS, StatusCode::OK, started.elapsed())
                .await;
            with_request_id(resp, &request_id)
        }
        Err(err) => {
            let resp = api_error_response(
                StatusCode::PAYMENT_REQUIRED,
                error_json(
                    ApiErrorCode::PaymentRejected,
                    &err.to_string(),
                    serde_json::json!({"transaction_id": txn.to_string()}),
                ),
            );
            state
                .metrics
                .observe_request(
                    ROUTE_REFUNDS,
                    StatusCode::PAYMENT_REQUIRED,
                    started.elapsed(),
                )
                .await;
            with_request_id(resp, &request_id)
        }
    }
}

pub(crate) async fn payment_status_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_txn): Path<String>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);

    let dto = match state.payments.status(&raw_txn).await {
        PaymentStatus::Completed {
            amount_cents,
            unix_timestamp,
        } => PaymentStatusDto {
            transaction_id: raw_txn,
            status: "completed".to_string(),
            amount_cents: Some(amount_cents),
            unix_timestamp: Some(unix_timestamp),
        },
        PaymentStatus::NotFound => PaymentStatusDto {
            transaction_id: raw_txn,
            status: "not_found".to_string(),
            amount_cents: None,
            unix_timestamp: None,
        },
    };
    let resp = json_response(StatusCode::OK, &serde_json::json!(dto), false);
    state
        .metrics
        .observe_request(ROUTE_PAYMENT_STATUS, StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}
