//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Server, login flows and hop client produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every inbound log line
//! - Upstream cookies and tokens are never logged, only counts

pub mod logging;
pub mod metrics;
