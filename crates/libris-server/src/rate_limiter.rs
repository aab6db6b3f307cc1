use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket per client key. Mutating routes consume one token per
/// request.
#[derive(Default)]
pub(crate) struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub(crate) async fn allow(&self, key: &str, cfg: &RateLimitConfig) -> bool {
        let now = Instant::now();
        let mut lock = self.buckets.lock().await;
        let bucket = lock.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: cfg.capacity,
            last_refill: now,
        });
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + (elapsed * cfg.refill_per_sec)).min(cfg.capacity);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bucket_exhausts_and_refuses() {
        let limiter = RateLimiter::default();
        let cfg = RateLimitConfig {
            capacity: 2.0,
            refill_per_sec: 0.0,
        };
        assert!(limiter.allow("patron", &cfg).await);
        assert!(limiter.allow("patron", &cfg).await);
        assert!(!limiter.allow("patron", &cfg).await);
        // a different key has its own bucket
        assert!(limiter.allow("other", &cfg).await);
    }
}
