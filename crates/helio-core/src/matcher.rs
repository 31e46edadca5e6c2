// SPDX-License-Identifier: BUSL-1.1
//! # Matcher Scope
//!
//! Static assets, image-optimization endpoints, the favicon and the public
//! directory never reach the gate. Everything else does.
//!
//! A path that fails normalization is always in scope, so a crafted path
//! such as `/_next/static/../contacts` cannot skip the gate.

use serde::{Deserialize, Serialize};

use crate::path::normalize_path;

/// Paths excluded from gating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatcherScope {
    /// Prefixes matched against the normalized path.
    pub excluded_prefixes: Vec<String>,
    /// File extensions (without the dot, case-insensitive) of the last segment.
    pub excluded_extensions: Vec<String>,
}

impl Default for MatcherScope {
    fn default() -> Self {
        Self {
            excluded_prefixes: ["/_next/static", "/_next/image", "/favicon.ico", "/public/"]
                .into_iter()
                .map(String::from)
                .collect(),
            excluded_extensions: ["svg", "png", "jpg", "jpeg", "gif", "webp", "ico"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl MatcherScope {
    /// An empty scope: the gate runs for every path.
    pub fn everything() -> Self {
        Self {
            excluded_prefixes: Vec::new(),
            excluded_extensions: Vec::new(),
        }
    }

    /// Whether the gate must run for this raw request target.
    pub fn includes(&self, raw_path: &str) -> bool {
        !self.excludes(raw_path)
    }

    pub fn excludes(&self, raw_path: &str) -> bool {
        let Ok(path) = normalize_path(raw_path) else {
            return false;
        };
        if self
            .excluded_prefixes
            .iter()
            .any(|p| path.starts_with(p.as_str()))
        {
            return true;
        }
        let last = path.rsplit('/').next().unwrap_or_default();
        match last.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self
                .excluded_extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(ext)),
            _ => false,
        }
    }
}
