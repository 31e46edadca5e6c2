// SPDX-License-Identifier: BUSL-1.1
//! Session client construction errors.

/// Errors building an [`crate::HttpSessionLookup`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The identity service base URL is not an absolute http(s) URL.
    #[error("invalid identity service URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The API key cannot be sent as an HTTP header value.
    #[error("identity API key contains characters not allowed in a header")]
    InvalidApiKey,

    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}
