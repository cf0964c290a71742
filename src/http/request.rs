//! Request handling and transformation.
//!
//! # Responsibilities
//! - Attach a request id (UUID v4) as early as possible for tracing
//! - Project the inbound request onto the outbound one: method verbatim,
//!   filtered headers, body only for payload-carrying methods
//!
//! # Design Decisions
//! - The body is streamed to the target, never buffered
//! - GET and HEAD never carry a body, even if the caller sent one

use axum::body::{Body, HttpBody};
use axum::http::{HeaderMap, HeaderName, Method};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use url::Url;

use crate::security::headers::forwardable_request_headers;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layer assigning an `x-request-id` to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer copying the request id onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// The request id of a request, for log correlation.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Whether a body is forwarded for this method.
pub fn carries_body(method: &Method) -> bool {
    method != Method::GET && method != Method::HEAD
}

/// Build the outbound request for a resolved target.
pub fn project_request(
    method: Method,
    headers: &HeaderMap,
    body: Body,
    target: Url,
) -> reqwest::Request {
    let with_body = carries_body(&method);
    let mut outbound = reqwest::Request::new(method, target);
    *outbound.headers_mut() = forwardable_request_headers(headers, with_body);

    if with_body && !body.is_end_stream() {
        *outbound.body_mut() = Some(reqwest::Body::wrap_stream(body.into_data_stream()));
    }
    outbound
}
