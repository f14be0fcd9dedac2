//! Background notifications for the admin console.
//!
//! Client-side activity (a new message, a fresh upload) is fanned out to
//! every connected admin console over SSE. The payload carries the URL an
//! "open" action should navigate to; dismissing is purely client-side, so
//! nothing here tracks delivery or acknowledgement.

use axum::extract::State;
use axum::http::HeaderMap;
use tokio::sync::broadcast;
use tracing::debug;

use atelier_shared::protocol::NotificationPayload;

use crate::api::AppState;
use crate::auth;
use crate::error::ServerError;
use crate::sse;

const CHANNEL_CAPACITY: usize = 64;

/// Fan-out hub for admin notifications.
#[derive(Clone)]
pub struct NotifyHub {
    tx: broadcast::Sender<NotificationPayload>,
}

impl NotifyHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationPayload> {
        self.tx.subscribe()
    }

    /// Publish to whoever is listening right now. Notifications are
    /// best-effort; with no console connected they simply evaporate.
    pub fn publish(&self, payload: NotificationPayload) {
        debug!(title = %payload.title, "Publishing admin notification");
        let _ = self.tx.send(payload);
    }
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

/// `GET /notify/watch`: SSE feed of admin notifications.
pub async fn watch_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<
    axum::response::sse::Sse<
        impl futures::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>,
    >,
    ServerError,
> {
    auth::require_admin(&state, &headers)?;
    Ok(sse::event_stream(None, state.notify.subscribe()))
}
