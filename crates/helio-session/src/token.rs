// SPDX-License-Identifier: BUSL-1.1
//! # Access Token Extraction
//!
//! Sources, in order:
//!
//! 1. `Authorization: Bearer <token>`
//! 2. the session cookie `<name>`, or its chunks `<name>.0`, `<name>.1`, …
//!    joined in index order (large sessions are split across cookies)
//!
//! A cookie value may carry a `base64-` prefix followed by base64url text.
//! The (decoded) value is then read as JSON: an object's `access_token`,
//! or the first element of an array. Anything that is not JSON is taken
//! as the raw token.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::Value;

use helio_core::RequestDescriptor;

const BASE64_PREFIX: &str = "base64-";

/// Upper bound on cookie chunks read for a single session.
const MAX_CHUNKS: usize = 32;

/// Find the access token carried by a request, if any.
pub fn extract_access_token(request: &RequestDescriptor, cookie_name: &str) -> Option<String> {
    if let Some(token) = bearer_token(request) {
        return Some(token);
    }
    let raw = cookie_value(request, cookie_name)?;
    decode_cookie_token(&raw)
}

/// Token from an `Authorization: Bearer` header. Scheme is case-insensitive.
pub fn bearer_token(request: &RequestDescriptor) -> Option<String> {
    let (scheme, token) = request.authorization()?.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    non_empty(token.trim())
}

/// The whole session cookie, or its chunks concatenated.
pub fn cookie_value(request: &RequestDescriptor, name: &str) -> Option<String> {
    if let Some(value) = request.cookie(name).filter(|v| !v.is_empty()) {
        return Some(value.to_string());
    }
    let mut joined = String::new();
    for index in 0..MAX_CHUNKS {
        match request.cookie(&format!("{name}.{index}")) {
            Some(chunk) => joined.push_str(chunk),
            None => break,
        }
    }
    non_empty(&joined)
}

/// Turn a stored cookie value into an access token.
pub fn decode_cookie_token(raw: &str) -> Option<String> {
    let text = match raw.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => {
            let bytes = URL_SAFE_NO_PAD
                .decode(encoded.trim_end_matches('='))
                .or_else(|_| STANDARD.decode(encoded))
                .ok()?;
            String::from_utf8(bytes).ok()?
        }
        None => raw.to_string(),
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => map.get("access_token").and_then(Value::as_str).and_then(non_empty),
        Ok(Value::Array(items)) => items.first().and_then(Value::as_str).and_then(non_empty),
        Ok(Value::String(token)) => non_empty(&token),
        Ok(_) => None,
        Err(_) => non_empty(text.trim()),
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
