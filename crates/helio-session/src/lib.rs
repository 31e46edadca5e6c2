// SPDX-License-Identifier: BUSL-1.1
//! # helio-session: Session Lookup over HTTP
//!
//! Implements [`helio_core::SessionLookup`] against a hosted identity
//! service with a GoTrue-style REST API. The adapter:
//!
//! 1. extracts an access token from the request (bearer header first, then
//!    the session cookie, including chunked and `base64-` encoded forms);
//! 2. returns "absent" without any network call when no token is found;
//! 3. otherwise validates the token with a single, timeout-bounded
//!    `GET /auth/v1/user` call. There is no retry.
//!
//! Status mapping: 2xx is a present session, 400/401/403/404 mean the token
//! is absent or invalid, anything else and transport failures are
//! [`helio_core::SessionError`]s for the gate to fail open on.

pub mod error;
pub mod http;
pub mod secret;
pub mod token;

pub use error::ClientError;
pub use http::{HttpSessionLookup, SessionServiceConfig, DEFAULT_COOKIE_NAME, DEFAULT_TIMEOUT_MS};
pub use secret::SecretString;
pub use token::extract_access_token;
