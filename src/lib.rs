//! Open CORS relay library.
//!
//! Forwards any request to the target named by `?url=` or `/proxy/<url>`,
//! relays the answer with permissive CORS headers, and keeps one opaque
//! blob per caller session at `/cookie`.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;
pub mod security;
pub mod session;

pub use config::RelayConfig;
pub use http::RelayServer;
pub use lifecycle::Shutdown;
