// crates/recall-server/src/pipeline/metrics.rs
// Request counters for the retrieval pipeline

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct Inner {
    total_requests: u64,
    llm_driven_requests: u64,
    fallback_requests: u64,
    error_count: u64,
    driven_successes: u64,
    average_latency_ms: f64,
    last_updated: DateTime<Utc>,
}

/// Read-only view of the counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub llm_driven_requests: u64,
    pub fallback_requests: u64,
    pub success_rate: f64,
    /// Running mean over successful LLM-driven requests
    pub average_latency_ms: f64,
    pub error_count: u64,
    pub last_updated: DateTime<Utc>,
}

/// Pipeline counters behind one mutex; updated per request, read rarely
pub struct PipelineMetrics {
    inner: Mutex<Inner>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                total_requests: 0,
                llm_driven_requests: 0,
                fallback_requests: 0,
                error_count: 0,
                driven_successes: 0,
                average_latency_ms: 0.0,
                last_updated: Utc::now(),
            }),
        }
    }

    fn update(&self, f: impl FnOnce(&mut Inner)) {
        if let Ok(mut inner) = self.inner.lock() {
            f(&mut inner);
            inner.last_updated = Utc::now();
        }
    }

    pub fn record_request(&self) {
        self.update(|m| m.total_requests += 1);
    }

    pub fn record_driven(&self) {
        self.update(|m| m.llm_driven_requests += 1);
    }

    pub fn record_fallback(&self) {
        self.update(|m| m.fallback_requests += 1);
    }

    pub fn record_error(&self) {
        self.update(|m| m.error_count += 1);
    }

    /// Fold one successful driven request into the running latency mean
    pub fn record_driven_success(&self, latency_ms: u64) {
        self.update(|m| {
            m.driven_successes += 1;
            let n = m.driven_successes as f64;
            m.average_latency_ms += (latency_ms as f64 - m.average_latency_ms) / n;
        });
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let success_rate = if inner.total_requests == 0 {
            1.0
        } else {
            (inner.total_requests - inner.error_count.min(inner.total_requests)) as f64
                / inner.total_requests as f64
        };
        MetricsSnapshot {
            total_requests: inner.total_requests,
            llm_driven_requests: inner.llm_driven_requests,
            fallback_requests: inner.fallback_requests,
            success_rate,
            average_latency_ms: inner.average_latency_ms,
            error_count: inner.error_count,
            last_updated: inner.last_updated,
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
