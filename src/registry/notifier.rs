//! Change notification queue.
//!
//! A bounded channel of payload-free events. A watcher learns that the
//! registry changed, never what changed, and re-reads the listing.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::{OverflowPolicy, RegistryConfig};
use crate::observability::metrics;

/// Token signalling that the registry mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent;

/// Producer side, owned by the registry.
#[derive(Debug)]
pub struct ChangeNotifier {
    tx: mpsc::Sender<ChangeEvent>,
    policy: OverflowPolicy,
    dropped: AtomicU64,
}

/// Consumer side, handed to the single watcher.
#[derive(Debug)]
pub struct ChangeEvents {
    rx: mpsc::Receiver<ChangeEvent>,
}

/// Create a connected notifier/watcher pair.
pub fn channel(config: &RegistryConfig) -> (ChangeNotifier, ChangeEvents) {
    let (tx, rx) = mpsc::channel(config.notify_capacity.max(1));
    (
        ChangeNotifier {
            tx,
            policy: config.overflow,
            dropped: AtomicU64::new(0),
        },
        ChangeEvents { rx },
    )
}

impl ChangeNotifier {
    /// Publish one event according to the overflow policy.
    ///
    /// With [`OverflowPolicy::Block`] this waits for a free slot. A dropped
    /// watcher never blocks the caller.
    pub async fn notify(&self) {
        match self.policy {
            OverflowPolicy::Block => {
                if self.tx.send(ChangeEvent).await.is_err() {
                    tracing::trace!("No registry watcher, change event discarded");
                }
            }
            OverflowPolicy::Drop => match self.tx.try_send(ChangeEvent) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    metrics::record_change_event_dropped();
                    tracing::warn!(dropped, "Change event queue full, event dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::trace!("No registry watcher, change event discarded");
                }
            },
        }
    }

    /// Events lost to a full queue since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }
}

impl ChangeEvents {
    /// Wait for at least one event, then drain whatever else is queued.
    ///
    /// Returns the number of events consumed, or `None` once the registry
    /// is gone.
    pub async fn changed(&mut self) -> Option<usize> {
        self.rx.recv().await?;
        Some(1 + self.drain())
    }

    /// Consume all queued events without waiting.
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while self.rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(capacity: usize, overflow: OverflowPolicy) -> RegistryConfig {
        RegistryConfig {
            notify_capacity: capacity,
            overflow,
        }
    }

    #[tokio::test]
    async fn test_drop_policy_counts_overflow() {
        let (notifier, mut events) = channel(&config(2, OverflowPolicy::Drop));

        for _ in 0..5 {
            notifier.notify().await;
        }

        assert_eq!(notifier.dropped(), 3);
        assert_eq!(events.drain(), 2);
    }

    #[tokio::test]
    async fn test_block_policy_waits_for_slot() {
        let (notifier, mut events) = channel(&config(1, OverflowPolicy::Block));
        notifier.notify().await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), notifier.notify()).await;
        assert!(blocked.is_err(), "second notify should wait on a full queue");

        assert_eq!(events.changed().await, Some(1));
        tokio::time::timeout(Duration::from_secs(1), notifier.notify())
            .await
            .expect("slot freed, notify should complete");
        assert_eq!(notifier.dropped(), 0);
    }

    #[tokio::test]
    async fn test_closed_watcher_does_not_block() {
        let (notifier, events) = channel(&config(1, OverflowPolicy::Block));
        drop(events);

        tokio::time::timeout(Duration::from_secs(1), async {
            notifier.notify().await;
            notifier.notify().await;
        })
        .await
        .expect("notify must not block without a watcher");
    }

    #[tokio::test]
    async fn test_changed_coalesces_queued_events() {
        let (notifier, mut events) = channel(&config(10, OverflowPolicy::Drop));
        notifier.notify().await;
        notifier.notify().await;
        notifier.notify().await;

        assert_eq!(events.changed().await, Some(3));
        drop(notifier);
        assert_eq!(events.changed().await, None);
    }
}
