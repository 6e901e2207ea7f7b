use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dto::sse::{Handshake, ServerEvent},
    error::ServiceError,
    state::{SharedState, SseHub},
};

const EVENT_HANDSHAKE: &str = "handshake";

/// Subscribe to the shared public SSE stream.
pub fn subscribe_public(state: &SharedState) -> broadcast::Receiver<ServerEvent> {
    state.public_sse().subscribe()
}

/// Subscribe to the presenter-only SSE stream, claiming the presenter token.
pub async fn subscribe_presenter(
    state: &SharedState,
) -> Result<(broadcast::Receiver<ServerEvent>, String), ServiceError> {
    let token = claim_presenter_token(state).await?;
    let receiver = state.presenter_sse().subscribe();
    Ok((receiver, token))
}

/// Identifies the target SSE stream so we can perform stream-specific
/// bookkeeping when the connection is torn down.
#[derive(Clone)]
pub enum StreamKind {
    /// Display stream.
    Public,
    /// Carries the shared state so teardown can release the presenter token.
    Presenter(SharedState),
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Countdown ticks are the usual victims; the next one supersedes them.
                            debug!(skipped, "SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        match kind {
            StreamKind::Public => info!("public SSE stream disconnected"),
            StreamKind::Presenter(state) => {
                reset_presenter_token(state).await;
                info!("presenter SSE stream disconnected");
            }
        }
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Reserve the presenter token for a new stream, failing if another presenter holds it.
async fn claim_presenter_token(state: &SharedState) -> Result<String, ServiceError> {
    let mut guard = state.presenter_token().lock().await;
    match &mut *guard {
        slot @ None => {
            let token = Uuid::new_v4().simple().to_string();
            slot.replace(token.clone());
            Ok(token)
        }
        Some(_) => Err(ServiceError::Unauthorized(
            "another presenter SSE stream is already active".into(),
        )),
    }
}

/// Send the connection handshake onto `hub`. Only the presenter handshake carries a token.
pub fn broadcast_handshake(hub: &SseHub, stream: &str, token: Option<String>) {
    let payload = Handshake {
        stream: stream.to_string(),
        message: format!("{stream} stream connected"),
        token,
    };
    if let Ok(event) = ServerEvent::json(Some(EVENT_HANDSHAKE.to_string()), &payload) {
        hub.broadcast(event);
    }
}

/// Release the presenter token so the next presenter negotiates a fresh one.
async fn reset_presenter_token(state: SharedState) {
    let mut guard = state.presenter_token().lock().await;
    guard.take();
}
