// SPDX-License-Identifier: BUSL-1.1
//! # Redirect Targets
//!
//! The login redirect preserves the original path in the `redirectTo`
//! query parameter, form-urlencoded so it survives a round trip. The
//! login flow reads it back with [`return_path_from_query`], which only
//! honours local paths.

use url::form_urlencoded;

/// Query parameter carrying the path to return to after login.
pub const REDIRECT_PARAM: &str = "redirectTo";

/// Build `<login_path>?redirectTo=<encoded original_path>`.
pub fn login_redirect(login_path: &str, original_path: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(REDIRECT_PARAM, original_path)
        .finish();
    format!("{login_path}?{query}")
}

/// Decode the `redirectTo` parameter from a raw query string.
pub fn redirect_param(query: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == REDIRECT_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Where to send a user after login: the decoded `redirectTo` when it is a
/// local path, otherwise `landing_path`.
pub fn return_path_from_query(query: Option<&str>, landing_path: &str) -> String {
    query
        .and_then(redirect_param)
        .filter(|path| is_local_path(path))
        .unwrap_or_else(|| landing_path.to_string())
}

/// A path on this origin: one leading `/`, no backslashes, no control characters.
pub fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control)
}
