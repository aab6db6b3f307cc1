use axum::http::StatusCode;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

const METRIC_SUBSYSTEM: &str = "libris";
const METRIC_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Default)]
pub(crate) struct RequestMetrics {
    counts: Mutex<HashMap<(String, u16), u64>>,
    latency_ns: Mutex<HashMap<String, Vec<u64>>>,
}

impl RequestMetrics {
    pub(crate) async fn observe_request(&self, route: &str, status: StatusCode, latency: Duration) {
        let mut counts = self.counts.lock().await;
        *counts
            .entry((route.to_string(), status.as_u16()))
            .or_insert(0) += 1;
        drop(counts);
        let mut latency_map = self.latency_ns.lock().await;
        latency_map
            .entry(route.to_string())
            .or_default()
            .push(latency.as_nanos() as u64);
    }

    pub(crate) async fn render_text(&self) -> String {
        let mut body = String::new();
        let counts = self.counts.lock().await;
        let mut count_rows: Vec<(&(String, u16), &u64)> = counts.iter().collect();
        count_rows.sort();
        for ((route, status), count) in count_rows {
            body.push_str(&format!(
                "libris_requests_total{{subsystem=\"{METRIC_SUBSYSTEM}\",version=\"{METRIC_VERSION}\",route=\"{route}\",status=\"{status}\"}} {count}\n",
            ));
        }
        drop(counts);
        let latency = self.latency_ns.lock().await;
        let mut latency_rows: Vec<(&String, &Vec<u64>)> = latency.iter().collect();
        latency_rows.sort();
        for (route, samples) in latency_rows {
            let p95_ms = percentile_ns(samples, 0.95) / 1_000_000;
            body.push_str(&format!(
                "libris_request_latency_p95_ms{{subsystem=\"{METRIC_SUBSYSTEM}\",version=\"{METRIC_VERSION}\",route=\"{route}\"}} {p95_ms}\n",
            ));
        }
        body
    }
}

fn percentile_ns(values: &[u64], pct: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut v = values.to_vec();
    v.sort_unstable();
    let idx = ((v.len() as f64 - 1.0) * pct).round() as usize;
    v[idx]
}
