#![forbid(unsafe_code)]
//! HTTP circulation service over the libris store.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use libris_model::FeeSchedule;
use libris_store::Store;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use tokio::sync::Mutex;

mod config;
mod http;
mod payments;
mod rate_limiter;
mod telemetry;

pub use config::{RateLimitConfig, ServerConfig, CONFIG_SCHEMA_VERSION};
pub use payments::{
    PaymentError, PaymentProvider, PaymentStatus, SimulatedProvider, CHARGE_LIMIT_CENTS,
};

pub const CRATE_NAME: &str = "libris-server";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<Store>>,
    pub config: Arc<ServerConfig>,
    pub fee_schedule: Arc<FeeSchedule>,
    pub payments: Arc<dyn PaymentProvider>,
    pub ready: Arc<AtomicBool>,
    pub accepting_requests: Arc<AtomicBool>,
    pub(crate) metrics: Arc<telemetry::RequestMetrics>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
    pub(crate) write_limiter: Arc<rate_limiter::RateLimiter>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Store, config: ServerConfig) -> Self {
        Self::with_provider(store, config, Arc::new(SimulatedProvider::default()))
    }

    #[must_use]
    pub fn with_provider(
        store: Store,
        config: ServerConfig,
        payments: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            config: Arc::new(config),
            fee_schedule: Arc::new(FeeSchedule::default()),
            payments,
            ready: Arc::new(AtomicBool::new(true)),
            accepting_requests: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(telemetry::RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
            write_limiter: Arc::new(rate_limiter::RateLimiter::default()),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::healthz_handler))
        .route("/readyz", get(http::readyz_handler))
        .route("/metrics", get(http::metrics_handler))
        .route("/openapi.json", get(http::openapi_handler))
        .route("/v1/version", get(http::version_handler))
        .route(
            "/v1/books",
            get(http::catalog::list_books_handler).post(http::catalog::add_book_handler),
        )
        .route("/v1/books/:id", get(http::catalog::get_book_handler))
        .route("/v1/loans", post(http::circulation::borrow_handler))
        .route("/v1/loans/return", post(http::circulation::return_handler))
        .route(
            "/v1/patrons/:patron_id",
            get(http::circulation::patron_report_handler),
        )
        .route(
            "/v1/patrons/:patron_id/fees",
            get(http::circulation::fee_inquiry_handler),
        )
        .route("/v1/payments", post(http::billing::pay_fees_handler))
        .route(
            "/v1/payments/refund",
            post(http::billing::refund_handler),
        )
        .route(
            "/v1/payments/:txn_id",
            get(http::billing::payment_status_handler),
        )
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .with_state(state)
}
