//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → tls.rs (optional TLS handshake)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - TLS is optional; without it the hosting platform terminates TLS
//! - Session cookies are issued `Secure` by default, so plain listeners
//!   should either sit behind TLS termination or set `session.secure = false`

pub mod tls;
