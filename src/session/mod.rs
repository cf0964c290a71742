//! Session-data facility.
//!
//! # Data Flow
//! ```text
//! POST /cookie (body = blob)
//!     → handlers.rs → SessionStore::store → Set-Cookie on the response
//!
//! GET /cookie
//!     → handlers.rs → SessionStore::retrieve → blob or "No cookie found"
//! ```
//!
//! # Design Decisions
//! - The relay core only sees the `SessionStore` contract
//! - `cookie` backend: the blob itself is the cookie (stateless)
//! - `memory` backend: the cookie carries a session id, the blob stays here

pub mod cookie;
pub mod handlers;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::sync::broadcast;

use crate::config::{SessionBackend, SessionConfig};

pub use cookie::CookieSessionStore;
pub use memory::MemorySessionStore;

/// Errors raised by a session backend.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("cannot encode cookie '{0}'")]
    InvalidCookie(String),

    #[error("session snapshot IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session snapshot format error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Proxy error: {self}")).into_response()
    }
}

/// Store and retrieve one opaque blob per caller session.
pub trait SessionStore: Send + Sync {
    /// Store `blob` for the session of the request carrying `request`
    /// headers. Returns headers the response must carry to bind the session.
    fn store(&self, request: &HeaderMap, blob: String) -> Result<HeaderMap, SessionError>;

    /// The blob stored for the caller's session, if any.
    fn retrieve(&self, request: &HeaderMap) -> Result<Option<String>, SessionError>;

    /// Drop expired blobs, returning how many were removed.
    fn purge_expired(&self) -> usize {
        0
    }

    /// Flush server-side state before shutdown.
    fn persist(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Build the configured backend.
pub fn build_store(config: &SessionConfig) -> Result<Arc<dyn SessionStore>, SessionError> {
    Ok(match config.backend {
        SessionBackend::Cookie => Arc::new(CookieSessionStore::new(config)),
        SessionBackend::Memory => Arc::new(MemorySessionStore::load(config)?),
    })
}

/// Periodically purge expired blobs until shutdown.
pub async fn run_sweeper(
    store: Arc<dyn SessionStore>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let purged = store.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired session blobs");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}
