// SPDX-License-Identifier: BUSL-1.1
//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded by
//! [`metrics_middleware`]. Gate decisions and failed session lookups are
//! recorded by the access gate middleware through [`GateMetrics::record_verdict`].

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::core::Collector;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

use helio_core::{RouteClass, SessionState, Verdict};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct GateMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    gate_decisions_total: IntCounterVec,
    session_lookup_failures_total: IntCounterVec,
}

impl std::fmt::Debug for GateMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl GateMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("helio_http_requests_total", "Total HTTP requests"),
            &["method", "route", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "helio_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "route"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("helio_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "route", "status"],
        )
        .expect("metric can be created");

        let gate_decisions_total = IntCounterVec::new(
            Opts::new(
                "helio_gate_decisions_total",
                "Access gate decisions by route class and outcome",
            ),
            &["class", "outcome"],
        )
        .expect("metric can be created");

        let session_lookup_failures_total = IntCounterVec::new(
            Opts::new(
                "helio_session_lookup_failures_total",
                "Session lookups that failed and were passed through",
            ),
            &["class"],
        )
        .expect("metric can be created");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(gate_decisions_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(session_lookup_failures_total.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                gate_decisions_total,
                session_lookup_failures_total,
            }),
        }
    }

    /// Total request count (sum across all labels).
    pub fn requests(&self) -> u64 {
        sum_counters(&self.inner.http_requests_total)
    }

    /// Total error count (sum across all labels).
    pub fn errors(&self) -> u64 {
        sum_counters(&self.inner.http_errors_total)
    }

    /// Count of decisions recorded for one `class`/`outcome` pair.
    pub fn decisions(&self, class: &str, outcome: &str) -> u64 {
        self.inner
            .gate_decisions_total
            .with_label_values(&[class, outcome])
            .get()
    }

    /// Number of distinct label sets in `helio_http_requests_total`.
    pub fn request_series(&self) -> usize {
        self.inner
            .http_requests_total
            .collect()
            .iter()
            .map(|mf| mf.get_metric().len())
            .sum()
    }

    /// Total failed session lookups.
    pub fn lookup_failures(&self) -> u64 {
        sum_counters(&self.inner.session_lookup_failures_total)
    }

    fn record_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, route, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, route])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, route, &status_str])
                .inc();
        }
    }

    /// Record one access gate verdict.
    pub fn record_verdict(&self, verdict: &Verdict) {
        let class = verdict.class.as_str();
        self.inner
            .gate_decisions_total
            .with_label_values(&[class, verdict.outcome()])
            .inc();
        if verdict.session == Some(SessionState::Unknown) {
            self.inner
                .session_lookup_failures_total
                .with_label_values(&[class])
                .inc();
        }
    }

    /// Gather all metrics and encode them in Prometheus text exposition format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for GateMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_counters(vec: &IntCounterVec) -> u64 {
    vec.collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Route label attached to a response by the access gate middleware.
///
/// HTTP metrics are labelled from this closed set, never from the raw path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteLabel(pub &'static str);

impl RouteLabel {
    pub const EXCLUDED: Self = Self("excluded");
    pub const OTHER: Self = Self("other");
}

impl From<RouteClass> for RouteLabel {
    fn from(class: RouteClass) -> Self {
        Self(class.as_str())
    }
}

fn method_label(method: &Method) -> &'static str {
    match method.as_str() {
        "GET" => "GET",
        "POST" => "POST",
        "PUT" => "PUT",
        "PATCH" => "PATCH",
        "DELETE" => "DELETE",
        "HEAD" => "HEAD",
        "OPTIONS" => "OPTIONS",
        _ => "OTHER",
    }
}

/// Axum middleware that records request count, latency, and errors.
pub async fn metrics_middleware(
    State(metrics): State<GateMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let method = method_label(request.method());
    let start = Instant::now();

    let response = next.run(request).await;

    let route = response
        .extensions()
        .get::<RouteLabel>()
        .copied()
        .unwrap_or(RouteLabel::OTHER);
    let duration = start.elapsed().as_secs_f64();
    metrics.record_request(method, route.0, response.status().as_u16(), duration);

    response
}
