use crate::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use libris_api::{ApiError, ApiErrorCode};
use libris_store::StoreError;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

pub(crate) mod billing;
pub(crate) mod catalog;
pub(crate) mod circulation;

pub(crate) fn api_error_response(status: StatusCode, err: ApiError) -> Response {
    let body = Json(json!({"error": err}));
    (status, body).into_response()
}

pub(crate) fn error_json(code: ApiErrorCode, message: &str, details: Value) -> ApiError {
    ApiError {
        code,
        message: message.to_string(),
        details,
    }
}

pub(crate) fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

pub(crate) fn propagated_request_id(headers: &HeaderMap, state: &AppState) -> String {
    if let Some(raw) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    make_request_id(state)
}

pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

pub(crate) fn is_draining(state: &AppState) -> bool {
    !state.accepting_requests.load(Ordering::Relaxed)
}

pub(crate) fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| "local".to_string(), ToString::to_string)
}

/// Draining and rate-limit gate for mutating routes. `Some` is the
/// refusal response, already observed in the metrics.
pub(crate) async fn mutation_guard(
    state: &AppState,
    headers: &HeaderMap,
    route: &str,
    started: Instant,
    request_id: &str,
) -> Option<Response> {
    if is_draining(state) {
        let resp = api_error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            error_json(
                ApiErrorCode::NotReady,
                "server draining; refusing new requests",
                json!({}),
            ),
        );
        state
            .metrics
            .observe_request(route, StatusCode::SERVICE_UNAVAILABLE, started.elapsed())
            .await;
        return Some(with_request_id(resp, request_id));
    }
    let key = client_key(headers);
    if !state
        .write_limiter
        .allow(&key, &state.config.write_rate_limit)
        .await
    {
        let resp = api_error_response(
            StatusCode::TOO_MANY_REQUESTS,
            error_json(
                ApiErrorCode::RateLimited,
                "write rate limit exceeded",
                json!({"client": key}),
            ),
        );
        state
            .metrics
            .observe_request(route, StatusCode::TOO_MANY_REQUESTS, started.elapsed())
            .await;
        return Some(with_request_id(resp, request_id));
    }
    None
}

pub(crate) fn param_error(name: &str, value: &str, err: &dyn std::fmt::Display) -> ApiError {
    error_json(
        ApiErrorCode::InvalidParameter,
        &err.to_string(),
        json!({"parameter": name, "value": value}),
    )
}

pub(crate) fn store_error_status(err: &StoreError) -> (StatusCode, ApiError) {
    match err {
        StoreError::BookMissing => (StatusCode::NOT_FOUND, ApiError::not_found("book")),
        StoreError::NoAvailableCopy => (
            StatusCode::CONFLICT,
            error_json(
                ApiErrorCode::Conflict,
                "this book is currently not available",
                json!({}),
            ),
        ),
        StoreError::LoanLimitReached => (
            StatusCode::CONFLICT,
            error_json(
                ApiErrorCode::LimitExceeded,
                "maximum borrowing limit of 5 books reached",
                json!({}),
            ),
        ),
        StoreError::NoActiveLoan => (
            StatusCode::CONFLICT,
            error_json(
                ApiErrorCode::Conflict,
                "no active loan for this patron and book",
                json!({}),
            ),
        ),
        StoreError::Sql(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_json(
                ApiErrorCode::Internal,
                "storage failure",
                json!({"message": msg}),
            ),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_json(ApiErrorCode::Internal, "storage failure", json!({})),
        ),
    }
}

pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

pub(crate) fn if_none_match(headers: &HeaderMap) -> Option<String> {
    headers
        .get("if-none-match")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

pub(crate) fn put_cache_headers(headers: &mut HeaderMap, ttl: Duration, etag: &str) {
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", ttl.as_secs())) {
        headers.insert("cache-control", value);
    }
    if let Ok(value) = HeaderValue::from_str(etag) {
        headers.insert("etag", value);
    }
}

pub(crate) fn json_response(status: StatusCode, payload: &Value, pretty: bool) -> Response {
    let body = if pretty {
        serde_json::to_vec_pretty(payload)
    } else {
        serde_json::to_vec(payload)
    };
    match body {
        Ok(bytes) => {
            let mut resp = (status, bytes).into_response();
            resp.headers_mut()
                .insert("content-type", HeaderValue::from_static("application/json"));
            resp
        }
        Err(e) => api_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_json(
                ApiErrorCode::Internal,
                "json serialization failed",
                json!({"message": e.to_string()}),
            ),
        ),
    }
}

pub(crate) async fn healthz_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let resp = (StatusCode::OK, "ok").into_response();
    state
        .metrics
        .observe_request("/healthz", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn readyz_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let store_ok = state.store.lock().await.probe().is_ok();
    let (status, body) = if state.ready.load(Ordering::Relaxed) && store_ok {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not-ready")
    };
    let resp = (status, body).into_response();
    state
        .metrics
        .observe_request("/readyz", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn metrics_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let body = state.metrics.render_text().await;
    let resp = (StatusCode::OK, body).into_response();
    state
        .metrics
        .observe_request("/metrics", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn version_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let payload = json!({
        "api_version": "v1",
        "server": {
            "crate": crate::CRATE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "config_schema_version": crate::config::CONFIG_SCHEMA_VERSION,
        }
    });
    let mut resp = Json(payload).into_response();
    if let Ok(value) = HeaderValue::from_str("public, max-age=30") {
        resp.headers_mut().insert("cache-control", value);
    }
    state
        .metrics
        .observe_request("/v1/version", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn openapi_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let resp = Json(libris_api::openapi_v1_spec()).into_response();
    state
        .metrics
        .observe_request("/openapi.json", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}
