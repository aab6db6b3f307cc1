// SPDX-License-Identifier: Apache-2.0

use super::*;
use axum::extract::{Path, Query};
use libris_api::params::parse_list_books_params_with_limit;
use libris_api::{decode_cursor, encode_cursor, query_hash, AddBookRequest};
use libris_model::{BookId, Isbn, NewBook};
use libris_store::{CatalogQuery, InsertOutcome, SearchMode};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::info;

const ROUTE_BOOKS: &str = "/v1/books";
const ROUTE_BOOK: &str = "/v1/books/{id}";

fn list_etag(revision: i64, hash: &str, after_id: Option<i64>, limit: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(revision.to_le_bytes());
    hasher.update(hash.as_bytes());
    hasher.update(after_id.unwrap_or_default().to_le_bytes());
    hasher.update((limit as u64).to_le_bytes());
    format!("\"{:x}\"", hasher.finalize())
}

pub(crate) async fn list_books_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    info!(request_id = %request_id, route = ROUTE_BOOKS, "request start");

    let parsed = match parse_list_books_params_with_limit(
        &params,
        state.config.default_page_size,
        state.config.max_page_size,
    ) {
        Ok(parsed) => parsed,
        Err(err) => {
            let resp = api_error_response(StatusCode::BAD_REQUEST, err);
            state
                .metrics
                .observe_request(ROUTE_BOOKS, StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    let hash = query_hash(parsed.q.as_deref(), parsed.by.as_deref());
    let after_id = match &parsed.cursor {
        Some(token) => match decode_cursor(token, &hash) {
            Ok(id) => Some(id),
            Err(err) => {
                let resp = api_error_response(
                    StatusCode::BAD_REQUEST,
                    error_json(
                        libris_api::ApiErrorCode::InvalidCursor,
                        &err.to_string(),
                        serde_json::json!({"cursor": token}),
                    ),
                );
                state
                    .metrics
                    .observe_request(ROUTE_BOOKS, StatusCode::BAD_REQUEST, started.elapsed())
                    .await;
                return with_request_id(resp, &request_id);
            }
        },
        None => None,
    };

    let search = parsed
        .q
        .clone()
        .map(|q| (q, SearchMode::from_param(parsed.by.as_deref().unwrap_or(""))));
    let query = CatalogQuery {
        search,
        after_id,
        limit: parsed.limit,
    };

    let (page, revision) = {
        let store = state.store.lock().await;
        let page = store.query_books(&query);
        let revision = store.catalog_revision();
        (page, revision)
    };
    let (page, revision) = match (page, revision) {
        (Ok(page), Ok(revision)) => (page, revision),
        (Err(err), _) | (_, Err(err)) => {
            let (status, body) = store_error_status(&err);
            let resp = api_error_response(status, body);
            state
                .metrics
                .observe_request(ROUTE_BOOKS, status, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    let etag = list_etag(revision, &hash, after_id, parsed.limit);
    if if_none_match(&headers).as_deref() == Some(etag.as_str()) {
        let mut resp = StatusCode::NOT_MODIFIED.into_response();
        put_cache_headers(resp.headers_mut(), state.config.catalog_ttl, &etag);
        state
            .metrics
            .observe_request(ROUTE_BOOKS, StatusCode::NOT_MODIFIED, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    }

    let next_cursor = if page.has_more {
        match page.books.last().map(|book| book.id.get()) {
            Some(last_id) => match encode_cursor(last_id, &hash) {
                Ok(token) => Some(token),
                Err(err) => {
                    let resp = api_error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        error_json(
                            libris_api::ApiErrorCode::Internal,
                            &err.to_string(),
                            serde_json::json!({}),
                        ),
                    );
                    state
                        .metrics
                        .observe_request(
                            ROUTE_BOOKS,
                            StatusCode::INTERNAL_SERVER_ERROR,
                            started.elapsed(),
                        )
                        .await;
                    return with_request_id(resp, &request_id);
                }
            },
            None => None,
        }
    } else {
        None
    };

    let payload = serde_json::json!({
        "books": page.books,
        "next_cursor": next_cursor,
    });
    let mut resp = json_response(StatusCode::OK, &payload, parsed.pretty);
    put_cache_headers(resp.headers_mut(), state.config.catalog_ttl, &etag);
    state
        .metrics
        .observe_request(ROUTE_BOOKS, StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn add_book_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddBookRequest>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    info!(request_id = %request_id, route = ROUTE_BOOKS, "catalog add start");
    if let Some(refused) =
        mutation_guard(&state, &headers, ROUTE_BOOKS, started, &request_id).await
    {
        return refused;
    }

    let isbn = match Isbn::parse(&req.isbn) {
        Ok(isbn) => isbn,
        Err(err) => {
            let resp =
                api_error_response(StatusCode::BAD_REQUEST, param_error("isbn", &req.isbn, &err));
            state
                .metrics
                .observe_request(ROUTE_BOOKS, StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };
    let new = match NewBook::new(&req.title, &req.author, isbn, req.total_copies) {
        Ok(new) => new,
        Err(err) => {
            let resp = api_error_response(
                StatusCode::BAD_REQUEST,
                error_json(
                    libris_api::ApiErrorCode::InvalidParameter,
                    &err.to_string(),
                    serde_json::json!({"title": req.title, "author": req.author}),
                ),
            );
            state
                .metrics
                .observe_request(ROUTE_BOOKS, StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    let outcome = state.store.lock().await.insert_book(&new);
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            let (status, body) = store_error_status(&err);
            let resp = api_error_response(status, body);
            state
                .metrics
                .observe_request(ROUTE_BOOKS, status, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };
    let created = matches!(outcome, InsertOutcome::Inserted(_));
    let book = outcome.book().clone();
    let payload = serde_json::json!({
        "book": book,
        "created": created,
        "message": format!(
            "Book \"{}\" has been successfully added to the catalog.",
            book.title
        ),
    });
    let resp = json_response(StatusCode::OK, &payload, false);
    state
        .metrics
        .observe_request(ROUTE_BOOKS, StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn get_book_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(raw_id): Path<i64>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);

    let book_id = match BookId::new(raw_id) {
        Ok(id) => id,
        Err(err) => {
            let resp = api_error_response(
                StatusCode::BAD_REQUEST,
                param_error("id", &raw_id.to_string(), &err),
            );
            state
                .metrics
                .observe_request(ROUTE_BOOK, StatusCode::BAD_REQUEST, started.elapsed())
                .await;
            return with_request_id(resp, &request_id);
        }
    };

    let book = state.store.lock().await.book_by_id(book_id);
    let (status, resp) = match book {
        Ok(Some(book)) => (
            StatusCode::OK,
            json_response(StatusCode::OK, &serde_json::json!({"book": book}), false),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            api_error_response(StatusCode::NOT_FOUND, libris_api::ApiError::not_found("book")),
        ),
        Err(err) => {
            let (status, body) = store_error_status(&err);
            (status, api_error_response(status, body))
        }
    };
    state
        .metrics
        .observe_request(ROUTE_BOOK, status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}
