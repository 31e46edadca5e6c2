// SPDX-License-Identifier: BUSL-1.1
//! # helio-core: Access Gate for the Helio CRM
//!
//! Every inbound request to the CRM passes through a single stateless
//! filter before it reaches a page or a handler. This crate holds that
//! filter with no HTTP framework attached: the gate takes an immutable
//! [`RequestDescriptor`], consults an injected [`SessionLookup`] and returns
//! an explicit [`Decision`].
//!
//! ## Route Classes
//!
//! | Class       | Session lookup | Session present     | Session absent          |
//! |-------------|----------------|---------------------|-------------------------|
//! | `api`       | skipped        | pass-through        | pass-through            |
//! | `public`    | performed      | redirect to landing | pass-through            |
//! | `protected` | performed      | pass-through        | redirect to login       |
//!
//! A failed session lookup always passes the request through (fail-open).
//! Downstream handlers perform their own authorization.
//!
//! ## Crate Policy
//!
//! - No dependency on any HTTP server or client crate.
//! - Classification and decisions are pure functions of configuration and input.
//! - No `.unwrap()` outside tests.

pub mod config;
pub mod gate;
pub mod matcher;
pub mod path;
pub mod redirect;
pub mod request;
pub mod route;
pub mod session;

pub use config::{ConfigError, GateConfig};
pub use gate::{AccessGate, Decision, SessionState, Verdict};
pub use matcher::MatcherScope;
pub use path::{normalize_path, PathError};
pub use redirect::{login_redirect, return_path_from_query, REDIRECT_PARAM};
pub use request::RequestDescriptor;
pub use route::{RouteClass, RouteTable};
pub use session::{Session, SessionError, SessionLookup};
