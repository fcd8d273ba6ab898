//! Single-hop client subsystem.
//!
//! # Data Flow
//! ```text
//! HopRequest { target_url, cookie_header }
//!     → client.rs (dial, HTTP/2 handshake, GET, drain body)
//!     → settle.rs (first event source wins)
//!     → HopResult { status, location, set_cookie, headers, body }
//! ```
//!
//! # Design Decisions
//! - Each call owns its transport session; nothing is shared or pooled
//! - No redirect following, no retries
//! - `HopClient` is the seam the login flows depend on

pub mod client;
pub mod settle;
pub mod types;

use async_trait::async_trait;

pub use client::H2HopClient;
pub use types::{HopError, HopRequest, HopResult};

/// Executes one outbound hop and settles exactly once.
#[async_trait]
pub trait HopClient: Send + Sync {
    async fn execute(&self, request: HopRequest) -> Result<HopResult, HopError>;
}
