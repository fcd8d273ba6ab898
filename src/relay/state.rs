//! Per-run flow state machine.
//!
//! # State Transitions
//! ```text
//! Start → HopPending(1) → (HopPending(2) →)? Rewriting → Responding → Done
//!              │                 │              │
//!              └────────────────┴──────────────┴──▶ Failed
//! ```
//!
//! A run lives for exactly one inbound request and is never shared.

use std::fmt;

use crate::hop::{HopClient, HopRequest, HopResult};
use crate::relay::RelayError;

/// Which login flow a run drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Initiate,
    Complete,
}

impl FlowKind {
    /// Number of hops the flow performs.
    pub fn hops(self) -> u8 {
        match self {
            FlowKind::Initiate => 2,
            FlowKind::Complete => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FlowKind::Initiate => "initiate",
            FlowKind::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    HopPending(u8),
    Rewriting,
    Responding,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Start => write!(f, "START"),
            Stage::HopPending(n) => write!(f, "HOP_{}_PENDING", n),
            Stage::Rewriting => write!(f, "REWRITING"),
            Stage::Responding => write!(f, "RESPONDING"),
            Stage::Done => write!(f, "DONE"),
            Stage::Failed => write!(f, "FAILED"),
        }
    }
}

/// Tracks one run through its stages.
#[derive(Debug)]
pub struct FlowRun {
    kind: FlowKind,
    stage: Stage,
    completed_hops: u8,
}

impl FlowRun {
    pub fn new(kind: FlowKind) -> Self {
        Self {
            kind,
            stage: Stage::Start,
            completed_hops: 0,
        }
    }

    /// Whether `next` is a legal successor of the current stage.
    fn allows(&self, next: Stage) -> bool {
        let hops = self.kind.hops();
        match (self.stage, next) {
            (Stage::Start, Stage::HopPending(1)) => true,
            (Stage::HopPending(n), Stage::HopPending(m)) => {
                m == n + 1 && m <= hops && self.completed_hops == n
            }
            (Stage::HopPending(n), Stage::Rewriting) => n == hops && self.completed_hops == hops,
            (Stage::HopPending(_), Stage::Failed) | (Stage::Rewriting, Stage::Failed) => true,
            (Stage::Rewriting, Stage::Responding) | (Stage::Responding, Stage::Done) => true,
            _ => false,
        }
    }

    fn advance(&mut self, next: Stage) {
        if !self.allows(next) {
            tracing::error!(flow = self.kind.as_str(), from = %self.stage, to = %next, "Illegal flow transition");
            debug_assert!(false, "illegal flow transition {} -> {}", self.stage, next);
        }
        tracing::debug!(flow = self.kind.as_str(), from = %self.stage, to = %next, "Flow transition");
        self.stage = next;
    }

    /// Run the next hop. On failure the run moves to `Failed`.
    pub async fn hop(
        &mut self,
        client: &dyn HopClient,
        request: HopRequest,
    ) -> Result<HopResult, RelayError> {
        let hop = self.completed_hops + 1;
        self.advance(Stage::HopPending(hop));

        match client.execute(request).await {
            Ok(result) => {
                self.completed_hops = hop;
                Ok(result)
            }
            Err(source) => Err(self.fail(RelayError::Hop { hop, source })),
        }
    }

    pub fn rewriting(&mut self) {
        self.advance(Stage::Rewriting);
    }

    pub fn responding(&mut self) {
        self.advance(Stage::Responding);
    }

    pub fn done(&mut self) {
        self.advance(Stage::Done);
    }

    /// Move to `Failed`, handing the error back.
    pub fn fail(&mut self, err: RelayError) -> RelayError {
        tracing::warn!(flow = self.kind.as_str(), stage = %self.stage, error = %err, "Login flow failed");
        self.advance(Stage::Failed);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::HopPending(2).to_string(), "HOP_2_PENDING");
        assert_eq!(Stage::Start.to_string(), "START");
    }

    #[test]
    fn test_initiate_requires_both_hops() {
        let mut run = FlowRun::new(FlowKind::Initiate);
        assert!(!run.allows(Stage::Rewriting));
        assert!(!run.allows(Stage::HopPending(2)));
        assert!(run.allows(Stage::HopPending(1)));

        run.advance(Stage::HopPending(1));
        // Hop 1 still in flight
        assert!(!run.allows(Stage::HopPending(2)));
        assert!(run.allows(Stage::Failed));

        run.completed_hops = 1;
        assert!(run.allows(Stage::HopPending(2)));
        assert!(!run.allows(Stage::Rewriting));

        run.advance(Stage::HopPending(2));
        run.completed_hops = 2;
        assert!(run.allows(Stage::Rewriting));
        assert!(!run.allows(Stage::HopPending(3)));
    }

    #[test]
    fn test_complete_flow_single_hop() {
        let mut run = FlowRun::new(FlowKind::Complete);
        run.advance(Stage::HopPending(1));
        run.completed_hops = 1;
        assert!(!run.allows(Stage::HopPending(2)));

        run.rewriting();
        run.responding();
        run.done();
        assert_eq!(run.stage, Stage::Done);
    }

    #[test]
    fn test_failed_is_absorbing() {
        let mut run = FlowRun::new(FlowKind::Complete);
        run.advance(Stage::HopPending(1));
        let err = run.fail(RelayError::malformed(1, "missing location"));
        assert_eq!(err, RelayError::malformed(1, "missing location"));
        assert_eq!(run.stage, Stage::Failed);

        for next in [Stage::Start, Stage::HopPending(1), Stage::Rewriting, Stage::Responding, Stage::Done] {
            assert!(!run.allows(next));
        }
    }

    #[test]
    fn test_no_skipping_pending() {
        let run = FlowRun::new(FlowKind::Complete);
        assert!(!run.allows(Stage::Rewriting));
        assert!(!run.allows(Stage::Responding));
        assert!(!run.allows(Stage::Failed));
    }
}
