//! Per-record snapshot fan-out.
//!
//! [`RecordWatch`] is the hub behind live record subscriptions: every
//! committed mutation publishes the full fresh snapshot, and each subscriber
//! receives snapshots in publish order. Subscribers that fall behind are
//! lagged, not blocked; since every snapshot fully replaces the previous one,
//! skipping intermediate frames is harmless.
//!
//! Publishing is synchronous so callers can do it while still holding the
//! store lock, which is what preserves commit order per record.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use atelier_shared::models::ProjectRecord;
use atelier_shared::types::RecordId;

/// Buffered snapshots per subscriber before older ones are dropped.
const CHANNEL_CAPACITY: usize = 64;

/// Fan-out hub for record snapshots.
#[derive(Clone, Default)]
pub struct RecordWatch {
    channels: Arc<Mutex<HashMap<RecordId, broadcast::Sender<ProjectRecord>>>>,
}

impl RecordWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a subscription for one record. The receiver sees every snapshot
    /// published after this call; the caller is responsible for delivering
    /// the initial read itself.
    pub fn subscribe(&self, id: RecordId) -> broadcast::Receiver<ProjectRecord> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish a committed snapshot to all current subscribers of its record.
    pub fn publish(&self, record: &ProjectRecord) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = channels.get(&record.id) {
            // Err means every receiver is gone; drop the channel so closed
            // subscriptions do not accumulate.
            if tx.send(record.clone()).is_err() {
                channels.remove(&record.id);
            }
        }
    }

    /// Number of live subscribers for a record (diagnostics).
    pub fn subscriber_count(&self, id: RecordId) -> usize {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels.get(&id).map_or(0, |tx| tx.receiver_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_shared::models::ProjectRecord;

    #[tokio::test]
    async fn subscribers_receive_snapshots_in_publish_order() {
        let watch = RecordWatch::new();
        let mut record = ProjectRecord::new("c@example.com");

        let mut rx = watch.subscribe(record.id);

        record.progress = 10;
        watch.publish(&record);
        record.progress = 20;
        watch.publish(&record);

        assert_eq!(rx.recv().await.unwrap().progress, 10);
        assert_eq!(rx.recv().await.unwrap().progress, 20);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let watch = RecordWatch::new();
        let record = ProjectRecord::new("c@example.com");

        // No panic, nothing retained.
        watch.publish(&record);
        assert_eq!(watch.subscriber_count(record.id), 0);
    }

    #[tokio::test]
    async fn records_are_isolated_from_each_other() {
        let watch = RecordWatch::new();
        let record_a = ProjectRecord::new("a@example.com");
        let record_b = ProjectRecord::new("b@example.com");

        let mut rx_a = watch.subscribe(record_a.id);
        let _rx_b = watch.subscribe(record_b.id);

        watch.publish(&record_b);
        watch.publish(&record_a);

        // Subscriber A only ever sees its own record.
        let got = rx_a.recv().await.unwrap();
        assert_eq!(got.id, record_a.id);
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned_on_next_publish() {
        let watch = RecordWatch::new();
        let record = ProjectRecord::new("c@example.com");

        let rx = watch.subscribe(record.id);
        drop(rx);

        watch.publish(&record);
        assert_eq!(watch.subscriber_count(record.id), 0);
    }
}
