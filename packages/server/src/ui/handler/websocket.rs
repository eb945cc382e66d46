//! WebSocket connection handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ConnectInfo, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header::USER_AGENT},
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{
        ClientCommand, ConnectionId, DisconnectReason, FileId, MessageId, PusherChannel, RoomId,
        ServerEvent, UserId,
    },
    ui::state::AppState,
    usecase::{ConnectError, ConnectionDetails, HistoryError, LeaveNotice},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user_id: String,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    // Convert String -> UserId (Domain Model)
    let user = match UserId::try_from(query.user_id.clone()) {
        Ok(user) => user,
        Err(_) => {
            tracing::warn!("Invalid user_id format: '{}'", query.user_id);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    let device_info = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let details = ConnectionDetails {
        device_info,
        ip_address: addr.ip().to_string(),
    };

    // Create a channel for this connection to receive events
    let conn = ConnectionId::generate();
    let (tx, rx) = mpsc::unbounded_channel();

    // Use ConnectParticipantUseCase to handle connection
    // (register_connection and duplicate-login arbitration happen inside)
    match state.connect_usecase.execute(&user, conn, tx.clone(), details).await {
        Ok(profile) => {
            tracing::info!("User '{}' ({}) connected as {}", user, profile.name, conn);
            Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user, conn, tx, rx)))
        }
        Err(ConnectError::Authentication) => {
            tracing::warn!("Rejecting unauthenticated connection for '{}'", user);
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(ConnectError::Presence(e)) => {
            tracing::error!("Presence registry unavailable: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Spawns a task that receives events from the rx channel, serializes
/// them, and pushes them to the WebSocket sender.
///
/// When the channel closes (unregister or kill), the loop ends and the
/// socket is dropped.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize server event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    user: UserId,
    conn: ConnectionId,
    tx: PusherChannel,
    rx: mpsc::UnboundedReceiver<ServerEvent>,
) {
    let (sender, mut receiver) = socket.split();

    // Outbound: events pushed to this connection
    let mut send_task = pusher_loop(rx, sender);

    // Inbound: commands from this client
    let recv_state = state.clone();
    let recv_user = user.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut reason = DisconnectReason::Transport;
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error for '{}': {}", recv_user, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    dispatch(&recv_state, &recv_user, &tx, &text).await;
                }
                Message::Close(_) => {
                    tracing::info!("User '{}' requested close", recv_user);
                    reason = DisconnectReason::Client;
                    break;
                }
                Message::Ping(_) => {
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                _ => {}
            }
        }
        reason
    });

    // If any one of the tasks completes, abort the other
    let reason = tokio::select! {
        finished = &mut recv_task => {
            send_task.abort();
            finished.unwrap_or(DisconnectReason::Transport)
        }
        _ = &mut send_task => {
            // The pusher channel was dropped out from under us (kill
            // after a duplicate login, or unregister).
            recv_task.abort();
            DisconnectReason::Transport
        }
    };

    state.disconnect_usecase.execute(&user, conn, reason).await;
}

/// Parse and route one inbound frame. Direct replies (join results,
/// history pages, errors) go straight back over this connection's
/// channel; room-wide effects go through the usecases.
async fn dispatch(state: &Arc<AppState>, user: &UserId, tx: &PusherChannel, text: &str) {
    let command = match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!("Unparseable frame from '{}': {}", user, e);
            reply(
                tx,
                ServerEvent::Error {
                    error_type: "invalidFormat".to_string(),
                    message: "Could not parse the message frame.".to_string(),
                },
            );
            return;
        }
    };

    match command {
        ClientCommand::JoinRoom { room_id } => {
            let room = match RoomId::try_from(room_id.clone()) {
                Ok(room) => room,
                Err(_) => {
                    reply(
                        tx,
                        ServerEvent::JoinRoomError {
                            message: format!("Invalid room id '{room_id}'."),
                        },
                    );
                    return;
                }
            };
            match state.join_usecase.execute(user, &room).await {
                Ok(outcome) => reply(
                    tx,
                    ServerEvent::JoinRoomSuccess {
                        room_id: outcome.room_id.as_str().to_string(),
                        participants: outcome.participants,
                        messages: outcome.messages,
                        has_more: outcome.has_more,
                        oldest_timestamp: outcome.oldest_timestamp,
                    },
                ),
                Err(e) => reply(
                    tx,
                    ServerEvent::JoinRoomError {
                        message: e.to_string(),
                    },
                ),
            }
        }

        ClientCommand::LeaveRoom => {
            if let Err(e) = state.leave_usecase.execute(user, LeaveNotice::Left).await {
                tracing::warn!("Leave failed for '{}': {}", user, e);
                reply(
                    tx,
                    ServerEvent::Error {
                        error_type: "leaveRoom".to_string(),
                        message: e.to_string(),
                    },
                );
            }
        }

        ClientCommand::ChatMessage {
            kind,
            content,
            file_id,
        } => {
            let file_id = match file_id {
                Some(raw) => match FileId::try_from(raw.clone()) {
                    Ok(id) => Some(id),
                    Err(_) => {
                        reply(
                            tx,
                            ServerEvent::Error {
                                error_type: "sendMessage".to_string(),
                                message: format!("Invalid file id '{raw}'."),
                            },
                        );
                        return;
                    }
                },
                None => None,
            };
            if let Err(e) = state
                .send_usecase
                .execute(user, kind, &content, file_id)
                .await
            {
                reply(
                    tx,
                    ServerEvent::Error {
                        error_type: "sendMessage".to_string(),
                        message: e.to_string(),
                    },
                );
            }
        }

        ClientCommand::FetchPreviousMessages { before } => {
            let room = match state.membership.current_room(user).await {
                Ok(Some(room)) => room,
                Ok(None) => {
                    reply(
                        tx,
                        ServerEvent::Error {
                            error_type: "history".to_string(),
                            message: "Join a room before fetching history.".to_string(),
                        },
                    );
                    return;
                }
                Err(e) => {
                    reply(
                        tx,
                        ServerEvent::Error {
                            error_type: "history".to_string(),
                            message: e.to_string(),
                        },
                    );
                    return;
                }
            };

            reply(tx, ServerEvent::MessageLoadStart);
            match state
                .history
                .load_page(&room, user, before, state.page_size)
                .await
            {
                Ok(page) => reply(
                    tx,
                    ServerEvent::PreviousMessagesLoaded {
                        messages: page.messages,
                        has_more: page.has_more,
                        oldest_timestamp: page.oldest_timestamp,
                    },
                ),
                Err(HistoryError::LoadInProgress) => {
                    // Dropped, not queued; the in-flight request will
                    // answer the client.
                    tracing::debug!("Dropped duplicate history fetch from '{}'", user);
                }
                Err(e) => reply(
                    tx,
                    ServerEvent::Error {
                        error_type: "history".to_string(),
                        message: e.to_string(),
                    },
                ),
            }
        }

        ClientCommand::MessageReaction {
            message_id,
            reaction,
            action,
        } => {
            let message_id = match MessageId::try_from(message_id.clone()) {
                Ok(id) => id,
                Err(_) => {
                    reply(
                        tx,
                        ServerEvent::Error {
                            error_type: "reaction".to_string(),
                            message: format!("Invalid message id '{message_id}'."),
                        },
                    );
                    return;
                }
            };
            if let Err(e) = state
                .react_usecase
                .execute(user, &message_id, &reaction, action)
                .await
            {
                reply(
                    tx,
                    ServerEvent::Error {
                        error_type: "reaction".to_string(),
                        message: e.to_string(),
                    },
                );
            }
        }
    }
}

fn reply(tx: &PusherChannel, event: ServerEvent) {
    if tx.send(event).is_err() {
        tracing::debug!("Connection channel closed, dropping direct reply");
    }
}
