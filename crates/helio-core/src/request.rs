// SPDX-License-Identifier: BUSL-1.1
//! Immutable request descriptor handed to the gate and the session lookup.

/// The parts of an inbound request the gate and session adapters read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDescriptor {
    path: String,
    query: Option<String>,
    cookies: Vec<(String, String)>,
    authorization: Option<String>,
}

impl RequestDescriptor {
    /// Build a descriptor from a request target such as `/contacts?tab=notes`.
    ///
    /// Any fragment is discarded; the query string is kept separately.
    pub fn new(target: &str) -> Self {
        let target = target.split('#').next().unwrap_or_default();
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        Self {
            path: path.to_string(),
            query,
            ..Self::default()
        }
    }

    /// Add a request cookie. Order is preserved.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Set the raw `Authorization` header value.
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    /// Path component, query stripped, not normalized.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    /// First cookie with the given name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }
}
