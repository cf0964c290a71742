//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the session routes and the relay fallback
//! - Wire up middleware (request id, tracing, panic capture, concurrency)
//! - Serve on plain TCP or TLS with graceful shutdown
//! - Run the session sweeper and persist sessions on the way out

use std::any::Any;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{Method, Request},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::{limit::GlobalConcurrencyLimitLayer, ServiceBuilder};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::RelayConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::preflight_response;
use crate::lifecycle::{triggered, Shutdown};
use crate::net::tls::load_tls_config;
use crate::observability::metrics;
use crate::relay::{Relay, RelayError};
use crate::session::handlers::{retrieve_blob, store_blob};
use crate::session::{build_store, run_sweeper, SessionError, SessionStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
    pub sessions: Arc<dyn SessionStore>,
}

/// Errors that stop the server from starting or serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("outbound client: {0}")]
    Relay(#[from] RelayError),

    #[error("session store: {0}")]
    Session(#[from] SessionError),
}

/// HTTP server for the relay.
pub struct RelayServer {
    router: Router,
    config: RelayConfig,
    sessions: Arc<dyn SessionStore>,
}

impl RelayServer {
    /// Create a new server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, ServerError> {
        let state = AppState {
            relay: Relay::new(&config.timeouts)?,
            sessions: build_store(&config.session)?,
        };
        Ok(Self::with_state(config, state))
    }

    /// Create a server around prepared state.
    pub fn with_state(config: RelayConfig, state: AppState) -> Self {
        let sessions = state.sessions.clone();
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            sessions,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// `/cookie` answers GET and POST; any other method there, and every
    /// other path, goes through the relay. HEAD is routed explicitly since
    /// a GET route would otherwise answer it.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        Router::new()
            .route(
                "/cookie",
                get(retrieve_blob)
                    .head(relay_handler)
                    .post(store_blob)
                    .fallback(relay_handler),
            )
            .fallback(relay_handler)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            request_id = %request_id(request.headers()),
                            method = %request.method(),
                            path = %request.uri().path(),
                        )
                    }))
                    .layer(propagate_request_id_layer())
                    .layer(CatchPanicLayer::custom(panic_response))
                    .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections)),
            )
    }

    /// The fully layered router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` is triggered.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);

        tokio::spawn(run_sweeper(
            self.sessions.clone(),
            Duration::from_secs(self.config.session.sweep_interval_secs),
            shutdown.subscribe(),
        ));

        match &self.config.listener.tls {
            Some(tls) => {
                let rustls = load_tls_config(tls).await?;
                tracing::info!(address = %addr, "HTTPS server starting");

                let handle = axum_server::Handle::new();
                let stopper = handle.clone();
                let stop = shutdown.subscribe();
                tokio::spawn(async move {
                    triggered(stop).await;
                    stopper.graceful_shutdown(Some(grace));
                });

                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(self.router.into_make_service())
                    .await?;
            }
            None => {
                tracing::info!(address = %addr, "HTTP server starting");

                let serve = axum::serve(listener, self.router.into_make_service())
                    .with_graceful_shutdown(triggered(shutdown.subscribe()))
                    .into_future();
                let deadline = async {
                    triggered(shutdown.subscribe()).await;
                    tokio::time::sleep(grace).await;
                };

                tokio::select! {
                    result = serve => result?,
                    _ = deadline => {
                        tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed, dropping in-flight requests");
                    }
                }
            }
        }

        if let Err(e) = self.sessions.persist() {
            tracing::error!(error = %e, "Failed to persist sessions");
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Relay handler: every request that is not a session operation.
async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();

    if request.method() == Method::OPTIONS {
        metrics::record_request(&method, 204, "preflight", start_time);
        return preflight_response();
    }

    let request_id = request_id(request.headers()).to_string();
    match state.relay.forward(request).await {
        Ok(response) => {
            let status = response.status();
            tracing::debug!(
                request_id = %request_id,
                status = status.as_u16(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Relayed response"
            );
            metrics::record_request(&method, status.as_u16(), "relayed", start_time);
            response
        }
        Err(err) => {
            if err.status().is_client_error() {
                tracing::warn!(request_id = %request_id, error = %err, "Rejected request");
            } else {
                tracing::error!(request_id = %request_id, error = ?err, "Relay failed");
            }
            metrics::record_request(&method, err.status().as_u16(), err.outcome(), start_time);
            err.into_response()
        }
    }
}

/// Turn a handler panic into the generic failure response.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    tracing::error!(panic = %message, "Request handler panicked");
    RelayError::Internal(message).into_response()
}
