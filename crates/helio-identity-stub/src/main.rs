// SPDX-License-Identifier: BUSL-1.1
//! Local identity service for running the gate without a hosted project.
//!
//! Serves the user lookup, health, sign-in and sign-out endpoints from an
//! in-memory token table. Tokens do not survive a restart.

mod routes;
mod store;

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 9999;

/// Listening port from `IDENTITY_STUB_PORT`, or the default when unset.
fn port_from_env(value: Option<String>) -> anyhow::Result<u16> {
    match value {
        None => Ok(DEFAULT_PORT),
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid IDENTITY_STUB_PORT {raw:?}")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = port_from_env(std::env::var("IDENTITY_STUB_PORT").ok())?;
    let state = store::AppState::new();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "identity stub ready");

    axum::serve(listener, routes::router(state))
        .await
        .context("identity stub server error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_when_unset() {
        assert_eq!(port_from_env(None).unwrap(), DEFAULT_PORT);
    }

    #[test]
    fn port_parsed_from_env_value() {
        assert_eq!(port_from_env(Some(" 54321 ".into())).unwrap(), 54321);
    }

    #[test]
    fn bad_port_is_an_error_not_a_fallback() {
        let err = port_from_env(Some("nine".into())).unwrap_err();
        assert!(err.to_string().contains("IDENTITY_STUB_PORT"));
    }
}
