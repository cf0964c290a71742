//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the target's status line, headers and body to the caller
//! - Strip the target's CSP headers and force permissive CORS headers
//! - Answer preflight requests with a bare 204
//!
//! # Design Decisions
//! - The body is streamed; dropping the caller's connection drops the
//!   outbound stream with it
//! - 3xx responses are relayed like any other; `Location` is not rewritten
//! - A non-canonical HTTP/1 reason phrase travels as hyper's `ReasonPhrase`
//!   extension, which the server writes back out

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use hyper::ext::ReasonPhrase;

use crate::security::headers::{apply_cors, cors_headers, strip_security_headers};

/// Turn the target's response into the caller's response.
pub fn project_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let headers = relay_headers(upstream.headers().clone());
    let reason = upstream.extensions().get::<ReasonPhrase>().cloned();

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    if let Some(reason) = reason {
        response.extensions_mut().insert(reason);
    }
    response
}

/// Header rewrite applied to every relayed response.
pub fn relay_headers(mut headers: HeaderMap) -> HeaderMap {
    strip_security_headers(&mut headers);
    apply_cors(&mut headers);
    headers
}

/// The answer to any OPTIONS request: 204, no body, CORS headers only.
pub fn preflight_response() -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    *response.headers_mut() = cors_headers();
    response
}
