use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub capacity: f64,
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 30.0,
            refill_per_sec: 10.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub max_body_bytes: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub catalog_ttl: Duration,
    pub write_rate_limit: RateLimitConfig,
    pub shutdown_drain: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("artifacts/libris.sqlite"),
            max_body_bytes: 16 * 1024,
            default_page_size: 50,
            max_page_size: 200,
            catalog_ttl: Duration::from_secs(30),
            write_rate_limit: RateLimitConfig::default(),
            shutdown_drain: Duration::from_millis(5000),
        }
    }
}
