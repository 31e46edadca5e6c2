// SPDX-License-Identifier: BUSL-1.1
//! # Access Gate
//!
//! Classifies the request path, consults the session lookup (except for API
//! paths) and returns an explicit [`Decision`].
//!
//! ```text
//! api        → Allow                       (no lookup)
//! public     → present: RedirectTo(landing)  absent/unknown: Allow
//! protected  → absent: RedirectTo(login)     present/unknown: Allow
//! ```
//!
//! `unknown` means the lookup failed. The gate logs and lets the request
//! through; it never produces an error response.

use crate::config::{ConfigError, GateConfig};
use crate::redirect::login_redirect;
use crate::request::RequestDescriptor;
use crate::route::{RouteClass, RouteTable};
use crate::session::SessionLookup;

/// What to do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Forward the request unmodified.
    Allow,
    /// Respond with a redirect to this location.
    RedirectTo(String),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::RedirectTo(location) => Some(location),
        }
    }
}

/// Result of the session lookup as seen by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Present,
    Absent,
    /// The lookup failed; treated as fail-open.
    Unknown,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Unknown => "unknown",
        }
    }
}

/// A decision together with the inputs that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub class: RouteClass,
    /// `None` when the lookup was skipped (API paths).
    pub session: Option<SessionState>,
    pub decision: Decision,
}

impl Verdict {
    /// Stable outcome label for metrics.
    pub fn outcome(&self) -> &'static str {
        match (&self.decision, self.session) {
            (Decision::RedirectTo(_), _) if self.class == RouteClass::Public => "redirect_landing",
            (Decision::RedirectTo(_), _) => "redirect_login",
            (Decision::Allow, Some(SessionState::Unknown)) => "fail_open",
            (Decision::Allow, _) => "allow",
        }
    }
}

/// The stateless access gate. Cheap to clone and share.
#[derive(Debug, Clone)]
pub struct AccessGate {
    routes: RouteTable,
    login_path: String,
    landing_path: String,
}

impl AccessGate {
    /// Build a gate from a validated configuration.
    pub fn new(config: &GateConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            routes: config.route_table(),
            login_path: config.login_path.clone(),
            landing_path: config.landing_path.clone(),
        })
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        self.routes.classify(path)
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    /// Pure decision table. `path` is the original request path, used only
    /// to build the login redirect.
    pub fn decide(&self, class: RouteClass, session: SessionState, path: &str) -> Decision {
        match (class, session) {
            (RouteClass::Api, _) => Decision::Allow,
            (RouteClass::Public, SessionState::Present) => {
                Decision::RedirectTo(self.landing_path.clone())
            }
            (RouteClass::Public, _) => Decision::Allow,
            (RouteClass::Protected, SessionState::Absent) => {
                Decision::RedirectTo(login_redirect(&self.login_path, path))
            }
            (RouteClass::Protected, _) => Decision::Allow,
        }
    }

    /// Evaluate a request against the session lookup.
    pub async fn evaluate<S>(&self, request: &RequestDescriptor, sessions: &S) -> Verdict
    where
        S: SessionLookup + ?Sized,
    {
        let class = self.classify(request.path());
        if class == RouteClass::Api {
            return Verdict {
                class,
                session: None,
                decision: Decision::Allow,
            };
        }

        let session = match sessions.current_session(request).await {
            Ok(Some(session)) => {
                tracing::debug!(
                    path = request.path(),
                    subject = session.subject().unwrap_or("-"),
                    "session present"
                );
                SessionState::Present
            }
            Ok(None) => SessionState::Absent,
            Err(e) => {
                tracing::warn!(
                    path = request.path(),
                    class = %class,
                    error = %e,
                    "session lookup failed, passing request through"
                );
                SessionState::Unknown
            }
        };

        Verdict {
            class,
            session: Some(session),
            decision: self.decide(class, session, request.path()),
        }
    }
}
