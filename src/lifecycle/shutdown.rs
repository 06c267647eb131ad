//! Shutdown coordination.
//!
//! # Responsibilities
//! - Tell every open connection to finish its in-flight request and close
//! - Wait for connection tasks to finish within the drain window

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that every connection task subscribes to.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of subscribers still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// How draining ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every connection task finished.
    Complete,
    /// The window elapsed; the remaining tasks were aborted.
    Forced { remaining: usize },
}

/// Wait up to `window` for every task in `connections` to finish.
///
/// Tasks still running at the deadline are aborted.
pub async fn drain(connections: &mut JoinSet<()>, window: Duration) -> DrainOutcome {
    let wait_all = async {
        while connections.join_next().await.is_some() {}
    };

    if tokio::time::timeout(window, wait_all).await.is_ok() {
        return DrainOutcome::Complete;
    }

    let remaining = connections.len();
    connections.shutdown().await;
    DrainOutcome::Forced { remaining }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_the_trigger() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 1);

        shutdown.trigger();
        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn drain_completes_when_tasks_finish() {
        let mut connections = JoinSet::new();
        connections.spawn(tokio::time::sleep(Duration::from_secs(1)));
        connections.spawn(async {});

        let outcome = drain(&mut connections, Duration::from_secs(5)).await;
        assert_eq!(outcome, DrainOutcome::Complete);
        assert!(connections.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drain_is_forced_at_the_deadline() {
        let mut connections = JoinSet::new();
        connections.spawn(tokio::time::sleep(Duration::from_secs(60)));
        connections.spawn(async {});

        let outcome = drain(&mut connections, Duration::from_secs(5)).await;
        assert_eq!(outcome, DrainOutcome::Forced { remaining: 1 });
        assert!(connections.is_empty());
    }

    #[tokio::test]
    async fn drain_of_nothing_is_complete() {
        let mut connections = JoinSet::new();
        let outcome = drain(&mut connections, Duration::from_millis(10)).await;
        assert_eq!(outcome, DrainOutcome::Complete);
    }
}
