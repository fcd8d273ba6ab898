//! Network subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound:
//!     bind address (+ optional PEM cert/key)
//!     → tls.rs (RustlsConfig for the listener)
//!     → http server
//!
//! Outbound (one per hop):
//!     hop URL
//!     → dial.rs (HopTarget, TCP connect, TLS with ALPN h2)
//!     → hop client HTTP/2 handshake
//! ```

pub mod dial;
pub mod tls;

pub use dial::{Dial, HopTarget, TlsDialer};
