// SPDX-License-Identifier: BUSL-1.1
//! Offline route check used by `helio-gate check-route`.
//!
//! Runs the real gate against a fixed session state, so operators can see
//! how a path is classified and what the gate would do, without any
//! network call.

use async_trait::async_trait;
use serde::Serialize;

use helio_core::{
    AccessGate, MatcherScope, RequestDescriptor, Session, SessionError, SessionLookup,
};

/// Session state to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SimulatedSession {
    Present,
    Absent,
    /// The lookup fails.
    Error,
}

struct FixedLookup(SimulatedSession);

#[async_trait]
impl SessionLookup for FixedLookup {
    async fn current_session(
        &self,
        _request: &RequestDescriptor,
    ) -> Result<Option<Session>, SessionError> {
        match self.0 {
            SimulatedSession::Present => Ok(Some(Session::with_subject("check-route"))),
            SimulatedSession::Absent => Ok(None),
            SimulatedSession::Error => Err(SessionError::Unavailable("simulated failure".into())),
        }
    }
}

/// Result of a route check, printed as JSON.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RouteReport {
    pub path: String,
    /// `false` when the matcher scope excludes the path.
    pub gated: bool,
    pub class: Option<&'static str>,
    pub session: Option<&'static str>,
    pub outcome: &'static str,
    pub location: Option<String>,
}

pub async fn check_route(
    gate: &AccessGate,
    matcher: &MatcherScope,
    target: &str,
    session: SimulatedSession,
) -> RouteReport {
    let descriptor = RequestDescriptor::new(target);
    if matcher.excludes(descriptor.path()) {
        return RouteReport {
            path: descriptor.path().to_string(),
            gated: false,
            class: None,
            session: None,
            outcome: "excluded",
            location: None,
        };
    }

    let verdict = gate.evaluate(&descriptor, &FixedLookup(session)).await;
    RouteReport {
        path: descriptor.path().to_string(),
        gated: true,
        class: Some(verdict.class.as_str()),
        session: verdict.session.map(|s| s.as_str()),
        outcome: verdict.outcome(),
        location: verdict.decision.location().map(str::to_string),
    }
}
