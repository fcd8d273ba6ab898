//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound session establishment (connect + TLS + HTTP/2 handshake)
//! - Bound each hop from request send to fully drained body
//! - Feed deadline expiry into the hop's settlement cell
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Timed-out hops surface as 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::config::TimeoutConfig;
use crate::hop::settle::{Abandoned, Settled, Settler};
use crate::hop::HopError;

/// Deadlines applied to a single hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HopDeadlines {
    pub connect: Duration,
    pub hop: Duration,
}

impl From<&TimeoutConfig> for HopDeadlines {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            connect: Duration::from_secs(config.connect_secs),
            hop: Duration::from_secs(config.hop_secs),
        }
    }
}

impl Default for HopDeadlines {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

/// Run `fut` with a deadline, mapping expiry to [`HopError::Timeout`].
pub async fn within<T, F>(limit: Duration, fut: F) -> Result<T, HopError>
where
    F: Future<Output = Result<T, HopError>>,
{
    match time::timeout(limit, fut).await {
        Ok(outcome) => outcome,
        Err(_) => Err(HopError::Timeout(limit)),
    }
}

/// Wait for a settlement cell, settling it with [`HopError::Timeout`] when `limit` passes.
///
/// The deadline competes with the other event sources through the cell, so
/// whichever settles first is what the caller sees.
pub async fn settle_within<T>(
    limit: Duration,
    settler: &Settler<T, HopError>,
    mut settled: Settled<T, HopError>,
) -> Result<T, HopError> {
    let outcome = match time::timeout(limit, &mut settled).await {
        Ok(outcome) => outcome,
        Err(_) => {
            if settler.settle(Err(HopError::Timeout(limit))) {
                tracing::warn!(timeout = ?limit, "Hop deadline exceeded");
            }
            // Either the deadline just settled the cell or another source beat it.
            settled.await
        }
    };
    outcome.unwrap_or_else(|Abandoned| Err(HopError::Transport("session ended without a result".to_string())))
}
