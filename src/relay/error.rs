//! Pipeline errors and their projection onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub const MISSING_TARGET_BODY: &str = "Missing target url (use ?url=... or /proxy/...)";
pub const INVALID_TARGET_BODY: &str = "Invalid target URL";

/// Everything that can go wrong while relaying one request.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Neither a `url` parameter nor a `/proxy/` path was given.
    #[error("missing target url")]
    MissingTarget,

    /// A target was given but is not an absolute URL with a host.
    #[error("invalid target url: {0}")]
    InvalidTarget(String),

    /// DNS, connect, TLS, timeout or protocol failure talking to the target.
    #[error("{0}")]
    Outbound(#[from] reqwest::Error),

    /// Any other fault inside the pipeline.
    #[error("{0}")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingTarget | RelayError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            RelayError::Outbound(_) | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for metrics and logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            RelayError::MissingTarget => "missing_target",
            RelayError::InvalidTarget(_) => "invalid_target",
            RelayError::Outbound(_) => "outbound_failure",
            RelayError::Internal(_) => "internal_error",
        }
    }

    /// Body sent to the caller. Caller mistakes get a fixed text; failures
    /// echo the underlying message.
    pub fn body(&self) -> String {
        match self {
            RelayError::MissingTarget => MISSING_TARGET_BODY.to_string(),
            RelayError::InvalidTarget(_) => INVALID_TARGET_BODY.to_string(),
            RelayError::Outbound(e) => format!("Proxy error: {}", describe(e)),
            RelayError::Internal(message) => format!("Proxy error: {message}"),
        }
    }
}

/// Flatten an error and its sources into one line.
fn describe(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), self.body()).into_response()
    }
}
