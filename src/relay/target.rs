//! Target resolution.
//!
//! Sources are checked in fixed priority order:
//! 1. the first `url` query parameter (form-decoded),
//! 2. a `/proxy/<percent-encoded-url>` path.
//!
//! Any absolute URL with a scheme and a host is accepted. There is no
//! allow-listing; loopback and link-local targets resolve like any other.

use axum::http::Uri;
use percent_encoding::percent_decode_str;
use url::{form_urlencoded, Url};

use crate::relay::error::RelayError;

/// Path prefix of the path-form target.
pub const PROXY_PATH_PREFIX: &str = "/proxy/";

/// Resolve the target of an inbound request.
pub fn resolve_target(uri: &Uri) -> Result<Url, RelayError> {
    let raw = target_string(uri)?.ok_or(RelayError::MissingTarget)?;
    parse_target(&raw)
}

/// Extract the raw target string, if the request names one.
///
/// An empty `url` parameter counts as absent, and the path form needs at
/// least one character after the prefix. A path that cannot be
/// percent-decoded is a pipeline fault, not a caller mistake.
fn target_string(uri: &Uri) -> Result<Option<String>, RelayError> {
    if let Some(query) = uri.query() {
        let from_query = form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "url")
            .map(|(_, value)| value.into_owned());
        if let Some(target) = from_query {
            return Ok(Some(target).filter(|t| !t.is_empty()));
        }
    }

    match uri.path().strip_prefix(PROXY_PATH_PREFIX) {
        Some(encoded) if !encoded.is_empty() => decode_path_target(encoded).map(Some),
        _ => Ok(None),
    }
}

/// Strict percent-decoding: every `%` must start a two-digit hex escape and
/// the decoded bytes must be UTF-8.
fn decode_path_target(encoded: &str) -> Result<String, RelayError> {
    let malformed = || RelayError::Internal(format!("URI malformed: {encoded}"));

    let bytes = encoded.as_bytes();
    let escapes_ok = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'%'
            || bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    });
    if !escapes_ok {
        return Err(malformed());
    }

    percent_decode_str(encoded)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| malformed())
}

/// Parse a target string as an absolute URL with a host.
pub fn parse_target(raw: &str) -> Result<Url, RelayError> {
    match Url::parse(raw) {
        Ok(url) if url.has_host() => Ok(url),
        _ => Err(RelayError::InvalidTarget(raw.to_string())),
    }
}
