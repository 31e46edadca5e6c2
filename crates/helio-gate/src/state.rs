// SPDX-License-Identifier: BUSL-1.1
//! Shared application state handed to every handler and middleware.

use std::sync::Arc;

use helio_core::{AccessGate, MatcherScope, SessionLookup};
use helio_session::{ClientError, HttpSessionLookup};

use crate::config::{GateSettings, SettingsError};
use crate::middleware::metrics::GateMetrics;
use crate::proxy::{ProxyError, UpstreamProxy};

/// Errors assembling [`AppState`] from settings.
#[derive(thiserror::Error, Debug)]
pub enum StateError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("identity client: {0}")]
    Identity(#[from] ClientError),

    #[error("upstream proxy: {0}")]
    Proxy(#[from] ProxyError),
}

/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AccessGate>,
    pub matcher: Arc<MatcherScope>,
    pub sessions: Arc<dyn SessionLookup>,
    /// Concrete identity client, kept for the readiness probe.
    pub identity: Option<Arc<HttpSessionLookup>>,
    pub upstream: Option<UpstreamProxy>,
    pub metrics: GateMetrics,
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("gate", &self.gate)
            .field("matcher", &self.matcher)
            .field("identity", &self.identity.is_some())
            .field("upstream", &self.upstream.as_ref().map(|u| u.base_url().as_str()))
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl AppState {
    /// State with the default matcher scope, no upstream and metrics on.
    pub fn new(gate: AccessGate, sessions: Arc<dyn SessionLookup>) -> Self {
        Self {
            gate: Arc::new(gate),
            matcher: Arc::new(MatcherScope::default()),
            sessions,
            identity: None,
            upstream: None,
            metrics: GateMetrics::new(),
            metrics_enabled: true,
        }
    }

    pub fn with_matcher(mut self, matcher: MatcherScope) -> Self {
        self.matcher = Arc::new(matcher);
        self
    }

    pub fn with_upstream(mut self, upstream: UpstreamProxy) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// Use the identity service both for lookups and readiness.
    pub fn with_identity(mut self, identity: Arc<HttpSessionLookup>) -> Self {
        self.sessions = identity.clone();
        self.identity = Some(identity);
        self
    }

    pub fn with_metrics_enabled(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Build the production state. Requires the identity service.
    pub fn from_settings(settings: &GateSettings) -> Result<Self, StateError> {
        settings.validate()?;
        let gate = AccessGate::new(&settings.gate).map_err(SettingsError::from)?;
        let identity = Arc::new(HttpSessionLookup::new(settings.session_config()?)?);

        let mut state = Self::new(gate, identity.clone())
            .with_identity(identity)
            .with_matcher(settings.matcher.clone())
            .with_metrics_enabled(settings.metrics_enabled);

        match &settings.upstream_url {
            Some(url) => {
                state = state.with_upstream(UpstreamProxy::new(url, settings.max_body_bytes)?);
            }
            None => tracing::warn!("no upstream configured; gated requests will receive 503"),
        }
        Ok(state)
    }
}
