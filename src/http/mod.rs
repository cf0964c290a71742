//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, route table)
//!     → request.rs (request id, outbound request projection)
//!     → [relay pipeline calls the target]
//!     → response.rs (strip CSP, force CORS, stream body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, RelayServer, ServerError};
