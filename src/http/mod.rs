//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, route table)
//!     → request.rs (request ID, `user` param, Cookie headers)
//!     → relay (Flow A / Flow B)
//!     → response.rs (302 + Set-Cookie, or 502 / 504)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::HttpServer;
