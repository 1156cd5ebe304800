//! Deferred-readiness timers.
//!
//! A node's ready transition is announced only after a settle delay, so
//! a burst of retained messages during reconstruction coalesces into one
//! `"node ready"` per node. Rescheduling replaces the pending timer;
//! cancellation aborts it.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use zmirror_core::NodeId;

/// Default settle delay before a node is announced ready.
pub const DEFAULT_READY_DELAY: Duration = Duration::from_secs(5);

/// Per-node one-shot timers feeding expiries into a channel.
#[derive(Debug)]
pub struct ReadyTimers {
    delay: Duration,
    tx: mpsc::UnboundedSender<NodeId>,
    pending: HashMap<NodeId, JoinHandle<()>>,
}

impl ReadyTimers {
    /// Create a timer set and the receiver its expiries arrive on.
    #[must_use]
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<NodeId>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                delay,
                tx,
                pending: HashMap::new(),
            },
            rx,
        )
    }

    /// Start the node's timer, replacing any pending one.
    pub fn schedule(&mut self, node_id: NodeId) {
        let tx = self.tx.clone();
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(node_id);
        });
        if let Some(previous) = self.pending.insert(node_id, handle) {
            previous.abort();
        }
    }

    /// Abort the node's pending timer, if any.
    pub fn cancel(&mut self, node_id: NodeId) {
        if let Some(handle) = self.pending.remove(&node_id) {
            handle.abort();
        }
    }

    /// Drop the bookkeeping for a timer whose expiry was received.
    pub fn finished(&mut self, node_id: NodeId) {
        self.pending.remove(&node_id);
    }

    /// Number of timers currently pending.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timer_fires_after_the_delay() {
        let (mut timers, mut rx) = ReadyTimers::new(Duration::from_secs(5));

        timers.schedule(7);
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(rx.recv().await, Some(7));
        timers.finished(7);
        assert_eq!(timers.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (mut timers, mut rx) = ReadyTimers::new(Duration::from_secs(5));

        timers.schedule(7);
        timers.cancel(7);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(rx.try_recv().is_err());
        assert_eq!(timers.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_replaces_the_pending_timer() {
        let (mut timers, mut rx) = ReadyTimers::new(Duration::from_secs(5));

        timers.schedule(7);
        tokio::time::sleep(Duration::from_secs(3)).await;
        timers.schedule(7);
        tokio::time::sleep(Duration::from_secs(3)).await;

        // The original would have fired by now; the replacement has not.
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(rx.recv().await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn independent_nodes_fire_independently() {
        let (mut timers, mut rx) = ReadyTimers::new(Duration::from_secs(5));

        timers.schedule(1);
        timers.schedule(2);
        timers.cancel(1);
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(rx.recv().await, Some(2));
        assert!(rx.try_recv().is_err());
    }
}
