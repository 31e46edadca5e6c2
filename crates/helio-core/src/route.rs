// SPDX-License-Identifier: BUSL-1.1
//! # Route Classification
//!
//! Static prefix matching against two configured lists. API prefixes are
//! checked first, so a path matching both lists is an API path.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::normalize_path;

/// The category every inbound path falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// Exempt from gating entirely; the session store is never consulted.
    Api,
    /// Reachable without a session (login, password reset).
    Public,
    /// Requires a session. The default for anything unmatched or malformed.
    Protected,
}

impl RouteClass {
    /// Stable lowercase label, used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Public => "public",
            Self::Protected => "protected",
        }
    }
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two prefix lists used for classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    api_prefixes: Vec<String>,
    public_prefixes: Vec<String>,
}

impl RouteTable {
    /// Build a table from API and public prefix lists.
    pub fn new<A, P>(api_prefixes: A, public_prefixes: P) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            api_prefixes: api_prefixes.into_iter().map(Into::into).collect(),
            public_prefixes: public_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Classify a raw request target (query string allowed).
    ///
    /// Malformed paths are classified [`RouteClass::Protected`].
    pub fn classify(&self, raw_path: &str) -> RouteClass {
        match normalize_path(raw_path) {
            Ok(path) => self.classify_normalized(&path),
            Err(e) => {
                tracing::debug!(path = raw_path, error = %e, "malformed path classified as protected");
                RouteClass::Protected
            }
        }
    }

    fn classify_normalized(&self, path: &str) -> RouteClass {
        if matches_any(&self.api_prefixes, path) {
            RouteClass::Api
        } else if matches_any(&self.public_prefixes, path) {
            RouteClass::Public
        } else {
            RouteClass::Protected
        }
    }

    pub fn api_prefixes(&self) -> &[String] {
        &self.api_prefixes
    }

    pub fn public_prefixes(&self) -> &[String] {
        &self.public_prefixes
    }
}

fn matches_any(prefixes: &[String], path: &str) -> bool {
    prefixes.iter().any(|p| path.starts_with(p.as_str()))
}
