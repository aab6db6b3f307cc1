#![forbid(unsafe_code)]

use libris_server::{build_router, AppState, RateLimitConfig, ServerConfig};
use libris_store::Store;
use std::env;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("LIBRIS_LOG_JSON", true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let bind_addr = env::var("LIBRIS_BIND").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
    let db_path = PathBuf::from(
        env::var("LIBRIS_DB_PATH").unwrap_or_else(|_| "artifacts/libris.sqlite".to_string()),
    );
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("create db dir {}: {e}", parent.display()))?;
        }
    }

    let config = ServerConfig {
        db_path: db_path.clone(),
        max_body_bytes: env_usize("LIBRIS_MAX_BODY_BYTES", 16 * 1024),
        default_page_size: env_usize("LIBRIS_DEFAULT_PAGE_SIZE", 50),
        max_page_size: env_usize("LIBRIS_MAX_PAGE_SIZE", 200),
        catalog_ttl: env_duration_ms("LIBRIS_CATALOG_TTL_MS", 30_000),
        write_rate_limit: RateLimitConfig {
            capacity: env_f64("LIBRIS_RATE_LIMIT_CAPACITY", 30.0),
            refill_per_sec: env_f64("LIBRIS_RATE_LIMIT_REFILL_PER_SEC", 10.0),
        },
        shutdown_drain: env_duration_ms("LIBRIS_SHUTDOWN_DRAIN_MS", 5000),
    };

    let store = Store::open(&db_path).map_err(|e| format!("open store: {e}"))?;
    let state = AppState::new(store, config);
    state.ready.store(
        state.store.lock().await.probe().is_ok(),
        Ordering::Relaxed,
    );
    let app = build_router(state.clone());

    let addr: std::net::SocketAddr = bind_addr
        .parse()
        .map_err(|e| format!("invalid bind addr {bind_addr}: {e}"))?;
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4().map_err(|e| format!("socket v4 failed: {e}"))?
    } else {
        tokio::net::TcpSocket::new_v6().map_err(|e| format!("socket v6 failed: {e}"))?
    };
    socket
        .set_reuseaddr(true)
        .map_err(|e| format!("set_reuseaddr failed: {e}"))?;
    socket
        .set_keepalive(env_bool("LIBRIS_TCP_KEEPALIVE_ENABLED", true))
        .map_err(|e| format!("set_keepalive failed: {e}"))?;
    socket.bind(addr).map_err(|e| format!("bind failed: {e}"))?;
    let listener: TcpListener = socket
        .listen(1024)
        .map_err(|e| format!("listen failed: {e}"))?;
    info!("libris-server listening on {bind_addr}");

    let accepting = state.accepting_requests.clone();
    let drain = state.config.shutdown_drain;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            // Refuse new mutations first, then let in-flight requests drain.
            accepting.store(false, Ordering::Relaxed);
            tokio::time::sleep(drain).await;
        })
        .await
        .map_err(|e| format!("server failed: {e}"))
}
