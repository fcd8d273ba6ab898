//! Single-assignment settlement cell.
//!
//! A hop has several independent event sources (session driver, request
//! exchange, deadline) that may each try to finish it. The cell is handed out
//! as cloneable [`Settler`]s; the first `settle` call wins and every later one
//! is a no-op. The owner awaits the matching [`Settled`] future.
//!
//! ```text
//! Pending ──settle(Ok)──▶ SettledOk
//!    │
//!    └────settle(Err)──▶ SettledErr
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

/// Observable state of a settlement cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleState {
    Pending,
    SettledOk,
    SettledErr,
}

struct Cell<T, E> {
    state: SettleState,
    tx: Option<oneshot::Sender<Result<T, E>>>,
}

/// Write side of the cell. Clone one per event source.
pub struct Settler<T, E> {
    cell: Arc<Mutex<Cell<T, E>>>,
}

impl<T, E> Clone for Settler<T, E> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T, E> Settler<T, E> {
    /// Settle the cell. Returns false if it was already settled.
    pub fn settle(&self, outcome: Result<T, E>) -> bool {
        let mut cell = match self.cell.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if cell.state != SettleState::Pending {
            return false;
        }
        cell.state = if outcome.is_ok() {
            SettleState::SettledOk
        } else {
            SettleState::SettledErr
        };
        if let Some(tx) = cell.tx.take() {
            // Receiver may be gone if the caller stopped waiting.
            let _ = tx.send(outcome);
        }
        true
    }

    /// Current state of the cell.
    pub fn state(&self) -> SettleState {
        match self.cell.lock() {
            Ok(guard) => guard.state,
            Err(poisoned) => poisoned.into_inner().state,
        }
    }
}

/// Every settler was dropped without settling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abandoned;

/// Read side of the cell. Resolves once, with the first settled outcome.
pub struct Settled<T, E> {
    rx: oneshot::Receiver<Result<T, E>>,
}

impl<T, E> Future for Settled<T, E> {
    type Output = Result<Result<T, E>, Abandoned>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|r| r.map_err(|_| Abandoned))
    }
}

/// Create a fresh pending cell.
pub fn cell<T, E>() -> (Settler<T, E>, Settled<T, E>) {
    let (tx, rx) = oneshot::channel();
    let settler = Settler {
        cell: Arc::new(Mutex::new(Cell {
            state: SettleState::Pending,
            tx: Some(tx),
        })),
    };
    (settler, Settled { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_error_then_success_keeps_error() {
        let (settler, settled) = cell::<&str, &str>();
        let late = settler.clone();

        assert!(settler.settle(Err("session reset")));
        assert!(!late.settle(Ok("response")));
        assert_eq!(settler.state(), SettleState::SettledErr);
        assert_eq!(settled.await, Ok(Err("session reset")));
    }

    #[tokio::test]
    async fn test_success_then_error_keeps_success() {
        let (settler, settled) = cell::<&str, &str>();
        let session = settler.clone();

        assert_eq!(settler.state(), SettleState::Pending);
        assert!(settler.settle(Ok("response")));
        assert!(!session.settle(Err("late transport error")));
        assert_eq!(session.state(), SettleState::SettledOk);
        assert_eq!(settled.await, Ok(Ok("response")));
    }

    #[tokio::test]
    async fn test_racing_tasks_settle_once() {
        let (settler, settled) = cell::<u32, u32>();
        let mut handles = Vec::new();
        for i in 0..16 {
            let s = settler.clone();
            handles.push(tokio::spawn(async move { s.settle(Ok(i)) }));
        }
        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
        assert!(settled.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_dropped_settlers_abandon() {
        let (settler, settled) = cell::<(), ()>();
        drop(settler);
        assert_eq!(settled.await, Err(Abandoned));
    }

    #[test]
    fn test_settle_after_receiver_dropped() {
        let (settler, settled) = cell::<(), ()>();
        drop(settled);
        assert!(settler.settle(Ok(())));
        assert!(!settler.settle(Ok(())));
    }
}
