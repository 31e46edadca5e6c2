// SPDX-License-Identifier: BUSL-1.1
//! # Path Normalization
//!
//! Request paths are normalized before prefix matching:
//!
//! 1. Query string and fragment are stripped.
//! 2. Runs of `/` collapse to a single separator.
//! 3. A trailing `/` is removed (the root stays `/`).
//!
//! Paths are never percent-decoded; matching runs on the raw text. A path
//! that cannot be normalized is reported as a [`PathError`], and callers
//! classify it as protected.

use thiserror::Error;

/// Reasons a request path is rejected as malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path component is empty.
    #[error("path is empty")]
    Empty,

    /// The path does not begin with `/`.
    #[error("path must start with '/': {0:?}")]
    NotAbsolute(String),

    /// A control or whitespace byte was found.
    #[error("path contains a control or whitespace character at byte {0}")]
    IllegalCharacter(usize),

    /// A `%` is not followed by two hex digits.
    #[error("path contains an invalid percent-escape at byte {0}")]
    InvalidEscape(usize),

    /// A `.` or `..` segment, literal or percent-encoded.
    #[error("path contains a dot segment: {0:?}")]
    DotSegment(String),
}

/// Return the path component of `raw`, dropping any query string or fragment.
pub fn strip_query(raw: &str) -> &str {
    let end = raw.find(|c| c == '?' || c == '#').unwrap_or(raw.len());
    &raw[..end]
}

/// Normalize a raw request target into the form used for prefix matching.
pub fn normalize_path(raw: &str) -> Result<String, PathError> {
    let path = strip_query(raw);
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if !path.starts_with('/') {
        return Err(PathError::NotAbsolute(path.to_string()));
    }

    let bytes = path.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b.is_ascii_control() || b.is_ascii_whitespace() {
            return Err(PathError::IllegalCharacter(i));
        }
        if b == b'%' {
            let valid = matches!(
                (bytes.get(i + 1), bytes.get(i + 2)),
                (Some(h), Some(l)) if h.is_ascii_hexdigit() && l.is_ascii_hexdigit()
            );
            if !valid {
                return Err(PathError::InvalidEscape(i));
            }
        }
    }

    let mut normalized = String::with_capacity(path.len());
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if is_dot_segment(segment) {
            return Err(PathError::DotSegment(segment.to_string()));
        }
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    Ok(normalized)
}

fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_query_and_fragment() {
        assert_eq!(strip_query("/contacts?tab=notes"), "/contacts");
        assert_eq!(strip_query("/contacts#top"), "/contacts");
        assert_eq!(strip_query("/contacts"), "/contacts");
        assert_eq!(normalize_path("/contacts?x=1#y").unwrap(), "/contacts");
    }

    #[test]
    fn trailing_slash_removed_except_root() {
        assert_eq!(normalize_path("/contacts/").unwrap(), "/contacts");
        assert_eq!(normalize_path("/").unwrap(), "/");
        assert_eq!(normalize_path("/?next=1").unwrap(), "/");
    }

    #[test]
    fn repeated_separators_collapse() {
        assert_eq!(normalize_path("//deals///42").unwrap(), "/deals/42");
    }

    #[test]
    fn percent_escapes_kept_verbatim() {
        assert_eq!(normalize_path("/notes/a%20b").unwrap(), "/notes/a%20b");
    }

    #[test]
    fn case_is_preserved() {
        assert_eq!(normalize_path("/Contacts").unwrap(), "/Contacts");
    }

    #[test]
    fn empty_rejected() {
        assert_eq!(normalize_path(""), Err(PathError::Empty));
        assert_eq!(normalize_path("?a=b"), Err(PathError::Empty));
    }

    #[test]
    fn relative_rejected() {
        assert!(matches!(
            normalize_path("contacts"),
            Err(PathError::NotAbsolute(_))
        ));
    }

    #[test]
    fn control_and_whitespace_rejected() {
        assert_eq!(normalize_path("/a b"), Err(PathError::IllegalCharacter(2)));
        assert_eq!(normalize_path("/a\nb"), Err(PathError::IllegalCharacter(2)));
        assert_eq!(normalize_path("/\tx"), Err(PathError::IllegalCharacter(1)));
    }

    #[test]
    fn bad_escapes_rejected() {
        assert_eq!(normalize_path("/a%2"), Err(PathError::InvalidEscape(2)));
        assert_eq!(normalize_path("/a%zz"), Err(PathError::InvalidEscape(2)));
        assert_eq!(normalize_path("/%"), Err(PathError::InvalidEscape(1)));
    }

    #[test]
    fn dot_segments_rejected() {
        assert!(matches!(
            normalize_path("/auth/../contacts"),
            Err(PathError::DotSegment(_))
        ));
        assert!(matches!(
            normalize_path("/api/./deals"),
            Err(PathError::DotSegment(_))
        ));
        assert!(matches!(
            normalize_path("/auth/%2E%2e/contacts"),
            Err(PathError::DotSegment(_))
        ));
    }

    #[test]
    fn dots_inside_segments_allowed() {
        assert_eq!(
            normalize_path("/media/roof.plan.pdf").unwrap(),
            "/media/roof.plan.pdf"
        );
        assert_eq!(normalize_path("/a/...").unwrap(), "/a/...");
    }
}
