//! `/cookie` handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN};
use axum::response::{IntoResponse, Response};

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::headers::CORS_ALLOW_ORIGIN;
use crate::session::SessionError;

pub const STORED_BODY: &str = "Cookie set!";
pub const NOT_FOUND_BODY: &str = "No cookie found";

fn with_cors(mut response: Response) -> Response {
    response.headers_mut().insert(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(CORS_ALLOW_ORIGIN),
    );
    response
}

/// `POST /cookie`: store the request body for the caller's session.
pub async fn store_blob(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, SessionError> {
    let blob = String::from_utf8_lossy(&body).into_owned();
    let session_headers = state.sessions.store(&headers, blob).inspect_err(|e| {
        metrics::record_session_op("store", "error");
        tracing::error!(error = %e, "Failed to store session blob");
    })?;
    metrics::record_session_op("store", "ok");

    let mut response = STORED_BODY.into_response();
    response.headers_mut().extend(session_headers);
    Ok(with_cors(response))
}

/// `GET /cookie`: return the caller's blob, or a fixed placeholder.
pub async fn retrieve_blob(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, SessionError> {
    let blob = state.sessions.retrieve(&headers).inspect_err(|e| {
        metrics::record_session_op("retrieve", "error");
        tracing::error!(error = %e, "Failed to retrieve session blob");
    })?;

    let body = match blob {
        Some(blob) => {
            metrics::record_session_op("retrieve", "hit");
            blob
        }
        None => {
            metrics::record_session_op("retrieve", "miss");
            NOT_FOUND_BODY.to_string()
        }
    };
    Ok(with_cors(body.into_response()))
}
