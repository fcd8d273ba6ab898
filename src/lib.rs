//! Login relay for a hosted identity provider.
//!
//! Drives the provider's multi-hop login handshake over HTTP/2 on the
//! caller's behalf and answers with a rewritten redirect plus the cookies
//! the browser needs on this origin.

pub mod config;
pub mod cookie;
pub mod hop;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;
pub mod resilience;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
