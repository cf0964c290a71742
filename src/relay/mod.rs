//! Forwarding pipeline.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → target.rs (resolve ?url= or /proxy/<encoded>)
//!     → http::request (method verbatim, filtered headers, body for non-GET/HEAD)
//!     → outbound call (redirects are not followed)
//!     → http::response (strip CSP, force CORS, stream body)
//!     → caller
//! ```
//!
//! # Design Decisions
//! - Stateless: nothing is shared between requests except the client pool
//! - No retries; one failed outbound call fails the inbound request
//! - Failures surface as `RelayError` and are projected to HTTP once, at the
//!   handler boundary

pub mod error;
pub mod target;

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use reqwest::redirect::Policy;

use crate::config::TimeoutConfig;
use crate::http::request::{project_request, request_id};
use crate::http::response::project_response;

pub use error::RelayError;
pub use target::{parse_target, resolve_target};

/// Executes relayed requests against their targets.
#[derive(Clone)]
pub struct Relay {
    client: reqwest::Client,
}

impl Relay {
    /// Build the outbound client. Redirects are surfaced, not followed.
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, RelayError> {
        let mut builder = reqwest::Client::builder()
            .redirect(Policy::none())
            .connect_timeout(Duration::from_secs(timeouts.connect_secs));
        if let Some(secs) = timeouts.request_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Run one inbound request through the pipeline.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response, RelayError> {
        let target = resolve_target(request.uri())?;
        let (parts, body) = request.into_parts();

        tracing::debug!(
            request_id = %request_id(&parts.headers),
            method = %parts.method,
            target_host = target.host_str().unwrap_or_default(),
            "Forwarding request"
        );

        let outbound = project_request(parts.method, &parts.headers, body, target);
        let upstream = self.client.execute(outbound).await?;
        Ok(project_response(upstream))
    }
}
