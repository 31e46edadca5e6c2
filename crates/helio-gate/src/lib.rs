// SPDX-License-Identifier: BUSL-1.1
//! # helio-gate
//!
//! Edge service in front of the Helio CRM application. Every request inside
//! the matcher scope passes the access gate; allowed requests are proxied to
//! the CRM, the rest are redirected to the login page or the dashboard.
//!
//! ## Routes
//!
//! | Path                 | Gated | Handler                          |
//! |----------------------|-------|----------------------------------|
//! | `/health/liveness`   | no    | `ok`                             |
//! | `/health/readiness`  | no    | upstream and identity checks     |
//! | `/metrics`           | no    | Prometheus text (when enabled)   |
//! | everything else      | yes   | reverse proxy to the CRM         |

pub mod check;
pub mod config;
pub mod error;
pub mod middleware;
pub mod proxy;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use config::{GateSettings, SettingsError};
pub use state::{AppState, StateError};

/// Assemble the application router.
///
/// Health probes and `/metrics` are mounted outside the access gate so they
/// stay reachable without a session.
pub fn app(state: AppState) -> Router {
    let mut gated = Router::new()
        .fallback(proxy::forward)
        .layer(from_fn_with_state(state.clone(), middleware::access::access_gate));

    if state.metrics_enabled {
        gated = gated.layer(from_fn_with_state(
            state.metrics.clone(),
            middleware::metrics::metrics_middleware,
        ));
    }

    let gated = gated
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let mut operational = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    if state.metrics_enabled {
        operational = operational.route("/metrics", get(prometheus_metrics));
    }

    Router::new()
        .merge(operational.with_state(state))
        .merge(gated)
}

/// Liveness probe. Always 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
///
/// Without an upstream the service cannot serve gated traffic, so it is not
/// ready. An unhealthy identity service is logged only: the gate fails open.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.upstream.is_none() {
        return (StatusCode::SERVICE_UNAVAILABLE, "upstream not configured").into_response();
    }

    if let Some(identity) = &state.identity {
        if let Err(e) = identity.health_check().await {
            tracing::warn!(error = %e, "identity service health check failed");
        }
    }

    (StatusCode::OK, "ready").into_response()
}

/// GET /metrics: Prometheus text exposition.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}
