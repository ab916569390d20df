use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,

    // Timing (in microseconds)
    total_extract_time_us: AtomicU64,
    total_enrich_time_us: AtomicU64,

    // Counts
    extractions: AtomicUsize,
    enrichments: AtomicUsize,
    nodes_enriched: AtomicUsize,
    predictions_served: AtomicUsize,
    predictions_degraded: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            failed_requests: AtomicUsize::new(0),
            total_extract_time_us: AtomicU64::new(0),
            total_enrich_time_us: AtomicU64::new(0),
            extractions: AtomicUsize::new(0),
            enrichments: AtomicUsize::new(0),
            nodes_enriched: AtomicUsize::new(0),
            predictions_served: AtomicUsize::new(0),
            predictions_degraded: AtomicUsize::new(0),
        })
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_extract(&self, duration: Duration) {
        self.total_extract_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.extractions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enrich(&self, duration: Duration, nodes: usize) {
        self.total_enrich_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.enrichments.fetch_add(1, Ordering::Relaxed);
        self.nodes_enriched.fetch_add(nodes, Ordering::Relaxed);
    }

    /// A degraded prediction is one answered with an error shape.
    pub fn record_prediction(&self, degraded: bool) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);
        if degraded {
            self.predictions_degraded.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            avg_extract_time_ms: avg_time_ms(&self.total_extract_time_us, &self.extractions),
            avg_enrich_time_ms: avg_time_ms(&self.total_enrich_time_us, &self.enrichments),
            extractions: self.extractions.load(Ordering::Relaxed),
            enrichments: self.enrichments.load(Ordering::Relaxed),
            nodes_enriched: self.nodes_enriched.load(Ordering::Relaxed),
            predictions_served: self.predictions_served.load(Ordering::Relaxed),
            predictions_degraded: self.predictions_degraded.load(Ordering::Relaxed),
        }
    }
}

fn avg_time_ms(total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
    let total = total_us.load(Ordering::Relaxed) as f64;
    let cnt = count.load(Ordering::Relaxed) as f64;
    if cnt > 0.0 {
        total / cnt / 1000.0 // Convert to ms
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub avg_extract_time_ms: f64,
    pub avg_enrich_time_ms: f64,
    pub extractions: usize,
    pub enrichments: usize,
    pub nodes_enriched: usize,
    pub predictions_served: usize,
    pub predictions_degraded: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
