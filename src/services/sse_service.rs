//! Streaming of session snapshots over Server-Sent Events.
//!
//! The session store is the broadcast hub here: its subscribe channel
//! already delivers one whole document per change, so the service only
//! reshapes those snapshots into SSE frames.

use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::warn;

use crate::{
    dao::session_store::SessionStore,
    dto::{
        session::SessionSummary,
        sse::{EVENT_SESSION_SNAPSHOT, ServerEvent},
    },
    error::ServiceError,
    state::{SharedState, session::SessionDocument},
};

/// Subscribe to a session's snapshot channel.
pub async fn subscribe_session(
    state: &SharedState,
    code: &str,
) -> Result<watch::Receiver<SessionDocument>, ServiceError> {
    let store = state.require_session_store().await?;
    store
        .subscribe(code)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("session `{code}` not found")))
}

/// Convert a snapshot receiver into an SSE response.
///
/// The receiver's current value is delivered immediately, then every
/// subsequent change; a client always starts from a complete document.
pub fn to_sse_stream(
    receiver: watch::Receiver<SessionDocument>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(receiver).filter_map(|document| async move {
        let summary = SessionSummary::from(document);
        match ServerEvent::json(Some(EVENT_SESSION_SNAPSHOT.to_string()), &summary) {
            Ok(payload) => {
                let mut event = Event::default().data(payload.data);
                if let Some(name) = payload.event {
                    event = event.event(name);
                }
                Some(Ok(event))
            }
            Err(err) => {
                warn!(error = %err, "failed to serialize session snapshot");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
