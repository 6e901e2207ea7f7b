use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::{ContestantInboundMessage, ContestantOutboundMessage},
    error::ServiceError,
    state::{ContestantConnection, SharedState, coordinator::ContestantAction, game::ContestantId},
};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Why the socket loop stopped handling a frame.
#[derive(Debug, Error)]
pub enum SocketError {
    /// Writer channel closed - connection should be terminated immediately.
    #[error("connection closed")]
    ConnectionClosed,
    /// The coordinator did not take the action.
    #[error("service error: {0}")]
    Service(#[from] ServiceError),
}

/// Handle the full lifecycle of a contestant WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket identification timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let contestant_id = match ContestantInboundMessage::from_json_str(&initial_message) {
        Ok(ContestantInboundMessage::Identification { id }) => id,
        Ok(_) => {
            warn!("first message was not identification");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Err(err) => {
            warn!(error = %err, "failed to parse or validate contestant message");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let greeting = match state.identify_contestant(contestant_id).await {
        Ok(Some(greeting)) => greeting,
        Ok(None) => {
            warn!(contestant = %contestant_id, "identification refused: not part of the loaded game");
            let _ = send_message_to_websocket(
                &outbound_tx,
                &ContestantOutboundMessage::Rejected {
                    message: format!("unknown contestant `{contestant_id}`"),
                },
            );
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Err(err) => {
            warn!(contestant = %contestant_id, error = %err, "identification failed");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    // A reconnect replaces the previous socket of the same contestant.
    if let Some(previous) = state.contestants().insert(
        contestant_id,
        ContestantConnection {
            id: contestant_id,
            tx: outbound_tx.clone(),
        },
    ) {
        info!(contestant = %previous.id, "replacing previous contestant connection");
        let _ = previous.tx.send(Message::Close(None));
    }
    info!(contestant = %contestant_id, "contestant connected");

    for message in &greeting {
        if send_message_to_websocket(&outbound_tx, message).is_err() {
            info!(contestant = %contestant_id, "connection closed during greeting, terminating");
            release(&state, contestant_id, &outbound_tx);
            finalize(writer_task, outbound_tx).await;
            return;
        }
    }

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(contestant = %contestant_id, payload = %text, "received contestant message");

                let action = match ContestantInboundMessage::from_json_str(&text) {
                    Ok(inbound) => match action_for(inbound) {
                        Some(action) => action,
                        None => {
                            warn!(contestant = %contestant_id, "ignoring unexpected contestant message");
                            continue;
                        }
                    },
                    Err(err) => {
                        warn!(contestant = %contestant_id, error = %err, "failed to parse or validate contestant message");
                        let reply = ContestantOutboundMessage::Rejected {
                            message: err.to_string(),
                        };
                        if send_message_to_websocket(&outbound_tx, &reply).is_err() {
                            break;
                        }
                        continue;
                    }
                };

                if let Err(err) = state.send_contestant_action(contestant_id, action).await {
                    warn!(contestant = %contestant_id, error = %err, "contestant action not delivered");
                    break;
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(contestant = %contestant_id, "contestant closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(contestant = %contestant_id, error = %err, "websocket error");
                break;
            }
        }
    }

    release(&state, contestant_id, &outbound_tx);
    info!(contestant = %contestant_id, "contestant disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Map an inbound message to the coordinator action it asks for.
fn action_for(message: ContestantInboundMessage) -> Option<ContestantAction> {
    match message {
        ContestantInboundMessage::Buzz => Some(ContestantAction::Buzz),
        ContestantInboundMessage::UsePowerUp { power_up } => {
            Some(ContestantAction::UsePowerUp(power_up))
        }
        ContestantInboundMessage::Wager { amount } => Some(ContestantAction::Wager(amount)),
        ContestantInboundMessage::FinaleAnswer { answer } => {
            Some(ContestantAction::FinaleAnswer(answer))
        }
        ContestantInboundMessage::Identification { .. } | ContestantInboundMessage::Unknown => None,
    }
}

/// Drop the registry entry unless a newer socket of the same contestant replaced it.
fn release(state: &SharedState, id: ContestantId, tx: &mpsc::UnboundedSender<Message>) {
    state
        .contestants()
        .remove_if(&id, |_, connection| connection.tx.same_channel(tx));
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Serialization failures are logged and swallowed; only a closed writer is reported.
pub fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), SocketError>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| SocketError::ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
