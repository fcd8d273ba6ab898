//! Login relay subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request (user / Cookie header)
//!     → flow.rs (Flow A: two hops, Flow B: one hop)
//!     → state.rs (per-run stage tracking)
//!     → location.rs (authorization URL rewrite)
//!     → RelayResponse (302 + ordered Set-Cookie) | RelayError
//! ```
//!
//! # Design Decisions
//! - Flow state lives for one inbound request only
//! - Hops go through the `HopClient` trait so flows can be driven by a scripted client
//! - Every failure maps to a status; no run leaves the caller unanswered

pub mod flow;
pub mod location;
pub mod state;
pub mod types;

pub use flow::LoginRelay;
pub use types::{RelayError, RelayResponse};
