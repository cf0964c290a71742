//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request:
//!     → headers.rs (drop caller-identifying headers)
//!     → forwarded to target
//!
//! Target response:
//!     → headers.rs (strip CSP, force CORS)
//!     → returned to caller
//! ```
//!
//! # Design Decisions
//! - Open relay: no target allow-listing, no authentication
//! - Caller identity never leaves the relay

pub mod headers;
