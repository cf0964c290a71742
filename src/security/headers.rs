//! Header sets and header manipulation.
//!
//! # Responsibilities
//! - Drop caller-identifying headers before a request leaves the relay
//! - Strip target security headers that break cross-origin consumption
//! - Add the permissive CORS headers to every relayed response
//!
//! # Design Decisions
//! - Every rule is a lookup against a fixed constant set. `HeaderName` is
//!   always lowercase, so membership is case-insensitive by construction.
//! - Duplicate header values are carried over in order.

use axum::http::header::{
    HeaderMap, HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH,
    CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY_REPORT_ONLY, HOST, ORIGIN, REFERER,
    TRANSFER_ENCODING,
};

/// Inbound headers that never reach the target. They either identify the
/// original caller or must be set by the outbound transport itself.
pub const EXCLUDED_REQUEST_HEADERS: [HeaderName; 5] = [
    HOST,
    ORIGIN,
    REFERER,
    HeaderName::from_static("x-forwarded-for"),
    HeaderName::from_static("cf-connecting-ip"),
];

/// Framing headers dropped together with a suppressed body.
const BODY_FRAMING_HEADERS: [HeaderName; 2] = [CONTENT_LENGTH, TRANSFER_ENCODING];

/// Target response headers removed before relaying.
pub const STRIPPED_RESPONSE_HEADERS: [HeaderName; 2] =
    [CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY_REPORT_ONLY];

pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
pub const CORS_ALLOW_HEADERS: &str = "*";

/// Whether an inbound header must be withheld from the target.
pub fn is_excluded_request_header(name: &HeaderName) -> bool {
    EXCLUDED_REQUEST_HEADERS.contains(name)
}

/// Project the inbound header multimap onto the outbound request.
///
/// When `with_body` is false the body is suppressed, so the framing headers
/// describing it are dropped as well.
pub fn forwardable_request_headers(inbound: &HeaderMap, with_body: bool) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if is_excluded_request_header(name) {
            continue;
        }
        if !with_body && BODY_FRAMING_HEADERS.contains(name) {
            continue;
        }
        outbound.append(name.clone(), value.clone());
    }
    outbound
}

/// Remove the target's content security policies.
pub fn strip_security_headers(headers: &mut HeaderMap) {
    for name in &STRIPPED_RESPONSE_HEADERS {
        headers.remove(name);
    }
}

/// Set the three CORS headers, replacing whatever the target sent.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(CORS_ALLOW_ORIGIN),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(CORS_ALLOW_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
}

/// A header map holding only the CORS headers.
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(3);
    apply_cors(&mut headers);
    headers
}
