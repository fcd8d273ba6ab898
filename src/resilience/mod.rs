//! Resilience subsystem.
//!
//! # Design Decisions
//! - Every outbound hop has a connect deadline and a hop deadline
//! - No retries: a failed hop fails the login flow
//! - Deadline expiry settles the hop; late events are ignored

pub mod timeouts;

pub use timeouts::HopDeadlines;
