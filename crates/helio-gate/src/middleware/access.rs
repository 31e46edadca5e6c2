// SPDX-License-Identifier: BUSL-1.1
//! # Access Gate Middleware
//!
//! Paths outside the matcher scope go straight to the next service. For the
//! rest, the request is reduced to a [`RequestDescriptor`] and evaluated by
//! the [`AccessGate`](helio_core::AccessGate). Allowed requests continue;
//! redirects are answered here with `307 Temporary Redirect`.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

use helio_core::{Decision, RequestDescriptor};

use crate::middleware::metrics::RouteLabel;
use crate::state::AppState;

/// Build the gate's view of an inbound request.
pub fn describe(request: &Request) -> RequestDescriptor {
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let jar = CookieJar::from_headers(request.headers());
    let mut descriptor = jar.iter().fold(RequestDescriptor::new(target), |d, cookie| {
        d.with_cookie(cookie.name(), cookie.value())
    });

    if let Some(auth) = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        descriptor = descriptor.with_authorization(auth);
    }
    descriptor
}

pub async fn access_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.matcher.excludes(request.uri().path()) {
        tracing::trace!(path = request.uri().path(), "outside matcher scope");
        return labelled(next.run(request).await, RouteLabel::EXCLUDED);
    }

    let descriptor = describe(&request);
    let verdict = state.gate.evaluate(&descriptor, state.sessions.as_ref()).await;
    state.metrics.record_verdict(&verdict);

    let response = match verdict.decision {
        Decision::Allow => next.run(request).await,
        Decision::RedirectTo(location) => {
            tracing::info!(
                path = descriptor.path(),
                class = %verdict.class,
                location = %location,
                "redirecting"
            );
            Redirect::temporary(&location).into_response()
        }
    };
    labelled(response, verdict.class.into())
}

fn labelled(mut response: Response, label: RouteLabel) -> Response {
    response.extensions_mut().insert(label);
    response
}
