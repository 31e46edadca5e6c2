// SPDX-License-Identifier: BUSL-1.1
//! # Session Lookup Capability
//!
//! The gate never talks to the identity service directly. It receives a
//! [`SessionLookup`] and asks it one question per request: is there a
//! current session? Validity of the session is the service's concern.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::request::RequestDescriptor;

/// Proof that a request carries an authenticated identity.
///
/// Opaque to the gate: only presence is consulted. The subject is kept for
/// debug logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    subject: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subject(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
        }
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }
}

/// Transient failures of the session service.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The service could not be reached.
    #[error("session service unavailable: {0}")]
    Unavailable(String),

    /// The single lookup attempt exceeded its time bound.
    #[error("session lookup timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The service answered with a status that says nothing about the token.
    #[error("session service returned HTTP {status}")]
    Upstream { status: u16 },
}

/// "Get current session for this request."
#[async_trait]
pub trait SessionLookup: Send + Sync {
    /// `Ok(Some(_))` when a session is present, `Ok(None)` when absent.
    async fn current_session(
        &self,
        request: &RequestDescriptor,
    ) -> Result<Option<Session>, SessionError>;
}

#[async_trait]
impl<T: SessionLookup + ?Sized> SessionLookup for Arc<T> {
    async fn current_session(
        &self,
        request: &RequestDescriptor,
    ) -> Result<Option<Session>, SessionError> {
        (**self).current_session(request).await
    }
}
