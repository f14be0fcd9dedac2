//! Cancellable event-stream subscriptions.
//!
//! A subscription is a spawned pump task reading an SSE response and
//! forwarding decoded frames into a channel. Cancellation is explicit
//! (`cancel()`) or implicit on drop; either way the task is aborted and the
//! connection closed, so tearing down a view or switching records never
//! leaks a stream.
//!
//! Pump failures are terminal: the error is logged and the last delivered
//! state is simply kept. Reconnection is left to whoever owns the
//! subscription (in practice: a fresh `locate()` on the dashboard).

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use atelier_shared::models::ProjectRecord;
use atelier_shared::protocol::NotificationPayload;
use atelier_shared::types::RecordId;

use crate::http::PortalApi;

/// Incremental parser for `text/event-stream` bodies.
///
/// Frames are separated by a blank line; only `data:` lines matter here
/// (comment/keep-alive lines are dropped). Multi-line data is rejoined with
/// newlines per the SSE spec.
pub(crate) struct SseParser {
    buffer: String,
}

impl SseParser {
    pub(crate) fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Feed raw bytes; returns the data payloads of any frames completed by
    /// this chunk.
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut payloads = Vec::new();
        while let Some(boundary) = self.buffer.find("\n\n") {
            let frame: String = self.buffer.drain(..boundary + 2).collect();

            let data = frame
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
                .collect::<Vec<_>>()
                .join("\n");

            if !data.is_empty() {
                payloads.push(data);
            }
        }
        payloads
    }
}

/// Run one SSE connection, decoding each frame as `T` and handing it to
/// `deliver` until the stream ends, errors, or `deliver` returns `false`.
async fn pump<T, F>(api: PortalApi, path: String, mut deliver: F)
where
    T: serde::de::DeserializeOwned,
    F: FnMut(T) -> bool,
{
    let response = match api.open_event_stream(&path).await {
        Ok(response) => response,
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open event stream");
            return;
        }
    };

    let mut stream = response.bytes_stream();
    let mut parser = SseParser::new();

    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(path = %path, error = %e, "Event stream failed");
                return;
            }
        };

        for data in parser.feed(&bytes) {
            match serde_json::from_str::<T>(&data) {
                Ok(value) => {
                    if !deliver(value) {
                        return;
                    }
                }
                Err(e) => warn!(path = %path, error = %e, "Skipping undecodable frame"),
            }
        }
    }

    debug!(path = %path, "Event stream ended");
}

// ---------------------------------------------------------------------------
// Record subscription
// ---------------------------------------------------------------------------

/// Live view of one project record.
///
/// Every delivered snapshot fully replaces the previous one; there is no
/// client-side merging. The latest snapshot is available synchronously via
/// [`RecordSubscription::latest`] and reactively via the watch receiver.
pub struct RecordSubscription {
    rx: watch::Receiver<Option<ProjectRecord>>,
    task: JoinHandle<()>,
}

impl RecordSubscription {
    pub(crate) fn open(api: PortalApi, id: RecordId) -> Self {
        let (tx, rx) = watch::channel(None);
        let path = format!("/records/{id}/watch");
        let task = tokio::spawn(async move {
            pump::<ProjectRecord, _>(api, path, move |record| tx.send(Some(record)).is_ok()).await;
        });
        Self { rx, task }
    }

    /// The most recently mirrored snapshot, if any frame has arrived yet.
    pub fn latest(&self) -> Option<ProjectRecord> {
        self.rx.borrow().clone()
    }

    /// A receiver that observes every delivered snapshot.
    pub fn receiver(&self) -> watch::Receiver<Option<ProjectRecord>> {
        self.rx.clone()
    }

    /// Close the subscription. Also happens automatically on drop.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for RecordSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ---------------------------------------------------------------------------
// Notification feed
// ---------------------------------------------------------------------------

/// Stream of background notifications for the admin console.
pub struct NotificationFeed {
    rx: mpsc::Receiver<NotificationPayload>,
    task: JoinHandle<()>,
}

impl NotificationFeed {
    pub(crate) fn open(api: PortalApi) -> Self {
        let (tx, rx) = mpsc::channel(32);
        let task = tokio::spawn(async move {
            pump::<NotificationPayload, _>(api, "/notify/watch".to_string(), move |payload| {
                match tx.try_send(payload) {
                    Ok(()) => true,
                    // A full buffer just drops the notification; only a
                    // dropped receiver ends the feed.
                    Err(mpsc::error::TrySendError::Full(_)) => true,
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                }
            })
            .await;
        });
        Self { rx, task }
    }

    /// Next notification, or `None` once the feed is closed.
    pub async fn next(&mut self) -> Option<NotificationPayload> {
        self.rx.recv().await
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for NotificationFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}
