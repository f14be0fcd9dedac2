//! Server-sent-event plumbing shared by the record and notification feeds.
//!
//! A feed is: an optional initial frame, then every value published on a
//! broadcast channel, each serialized as one JSON `data:` frame. The stream
//! ends when the hub side closes; a subscriber that falls behind skips the
//! frames it lagged past and continues with newer ones, which is safe
//! because every frame carries complete state.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;

/// Build an SSE response from an optional initial value and a broadcast
/// subscription.
pub fn event_stream<T>(
    initial: Option<T>,
    rx: broadcast::Receiver<T>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Serialize + Clone + Send + 'static,
{
    let first = stream::iter(initial.as_ref().and_then(to_event).map(Ok));

    let rest = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(value) => {
                    if let Some(event) = to_event(&value) {
                        return Some((Ok(event), rx));
                    }
                    // Unserializable frame: drop it and wait for the next.
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "SSE subscriber lagged, continuing");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(first.chain(rest)).keep_alive(KeepAlive::default())
}

fn to_event<T: Serialize>(value: &T) -> Option<Event> {
    match Event::default().json_data(value) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode SSE frame");
            None
        }
    }
}
