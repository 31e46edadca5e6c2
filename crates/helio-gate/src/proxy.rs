// SPDX-License-Identifier: BUSL-1.1
//! # Upstream Proxy
//!
//! Forwards requests that passed the access gate to the CRM application and
//! relays its response. Hop-by-hop headers are dropped in both directions.
//! Upstream redirects are relayed to the client, not followed.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;
use url::Url;

use crate::error::AppError;
use crate::state::AppState;

/// Per-request timeout for the upstream application.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
    "host",
];

/// Errors building an [`UpstreamProxy`].
#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
    #[error("invalid upstream URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build upstream HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Reverse proxy to a single upstream base URL.
#[derive(Debug, Clone)]
pub struct UpstreamProxy {
    client: reqwest::Client,
    base: Url,
    max_body_bytes: usize,
}

impl UpstreamProxy {
    pub fn new(base_url: &str, max_body_bytes: usize) -> Result<Self, ProxyError> {
        Self::with_timeout(base_url, max_body_bytes, DEFAULT_UPSTREAM_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        max_body_bytes: usize,
        timeout: Duration,
    ) -> Result<Self, ProxyError> {
        let base = Url::parse(base_url).map_err(|e| ProxyError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ProxyError::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme {:?}", base.scheme()),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(ProxyError::Build)?;

        Ok(Self {
            client,
            base,
            max_body_bytes,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Absolute upstream URL for an inbound request URI.
    fn target_url(&self, uri: &Uri) -> Result<Url, AppError> {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        let joined = format!(
            "{}{}",
            self.base.as_str().trim_end_matches('/'),
            path_and_query
        );
        Url::parse(&joined).map_err(|e| AppError::Internal(format!("upstream URL {joined}: {e}")))
    }

    /// Send `request` upstream and stream the reply back.
    ///
    /// The request body is buffered up to `max_body_bytes`. The response
    /// body is streamed with the upstream framing headers left intact, so
    /// `HEAD` and `304` replies keep their `Content-Length`.
    pub async fn forward(&self, request: Request) -> Result<Response, AppError> {
        let (parts, body) = request.into_parts();
        let url = self.target_url(&parts.uri)?;

        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| body_error(e, self.max_body_bytes))?;

        let client_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let mut headers = parts.headers;
        let original_host = headers.get(header::HOST).cloned();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::CONTENT_LENGTH);
        set_forwarded_headers(&mut headers, original_host, client_ip, &parts.uri);

        tracing::debug!(method = %parts.method, %url, "forwarding to upstream");
        let upstream = self
            .client
            .request(parts.method, url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| upstream_error(&url, e))?;

        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        strip_hop_by_hop(&mut response_headers);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

/// Set `X-Forwarded-Host`, `-For` and `-Proto` for the upstream.
///
/// An existing `X-Forwarded-For` chain is extended with the peer address.
/// An existing `X-Forwarded-Proto` from a load balancer in front is kept.
fn set_forwarded_headers(
    headers: &mut HeaderMap,
    host: Option<HeaderValue>,
    client_ip: Option<IpAddr>,
    uri: &Uri,
) {
    if let Some(host) = host {
        headers.insert(X_FORWARDED_HOST, host);
    }

    if let Some(ip) = client_ip {
        let chain = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(prior) if !prior.trim().is_empty() => format!("{}, {ip}", prior.trim()),
            _ => ip.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&chain) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }

    if !headers.contains_key(X_FORWARDED_PROTO) {
        let proto = match uri.scheme_str() {
            Some("https") => "https",
            _ => "http",
        };
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static(proto));
    }
}

fn body_error(e: axum::Error, limit: usize) -> AppError {
    if is_length_limit(&e) {
        AppError::PayloadTooLarge(format!("request body exceeds {limit} bytes"))
    } else {
        AppError::BadRequest(format!("unreadable request body: {e}"))
    }
}

fn is_length_limit(e: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(e);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}

fn upstream_error(url: &Url, e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::UpstreamTimeout(format!("{url}: {e}"))
    } else {
        AppError::UpstreamError(format!("{url}: {e}"))
    }
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Fallback handler for every gated route.
pub async fn forward(State(state): State<AppState>, request: Request) -> Response {
    let Some(proxy) = state.upstream.as_ref() else {
        return AppError::service_unavailable("upstream application not configured")
            .into_response();
    };
    match proxy.forward(request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
