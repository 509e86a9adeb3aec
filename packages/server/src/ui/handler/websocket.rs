//! Connection Gateway: WebSocket upgrade and per-connection pumps.

use std::sync::Arc;

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{Credentials, Identity, RaceId},
    infrastructure::dto::websocket::{ErrorKind, ServerMessage},
    room::RoomHandle,
    ui::{
        session::{HeartbeatStatus, InboundEvent, Session},
        state::AppState,
    },
    usecase::JoinRaceError,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub participant_id: Option<String>,
    pub display_name: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(race_id): Path<String>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let race_id = RaceId::try_from(race_id).map_err(|e| {
        tracing::warn!("Invalid race id: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    let credentials = Credentials {
        participant_id: query.participant_id,
        display_name: query.display_name,
    };
    let identity = state
        .join_race_usecase
        .authenticate(&credentials)
        .await
        .map_err(|e| {
            tracing::warn!("Rejecting connection to race '{}': {}", race_id, e);
            StatusCode::UNAUTHORIZED
        })?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, race_id, identity)))
}

/// Spawns a task that forwards frames queued for this session to the socket.
///
/// When the room drops the session's channel (room closed, or a newer
/// session replaced this one) the socket is closed.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    })
}

async fn send_error(sender: &mut SplitSink<WebSocket, Message>, frame: ServerMessage) {
    match serde_json::to_string(&frame) {
        Ok(json) => {
            let _ = sender.send(Message::Text(json.into())).await;
        }
        Err(e) => tracing::error!("Failed to serialize error frame: {}", e),
    }
    let _ = sender.send(Message::Close(None)).await;
}

/// Next text frame, or `None` once the peer is gone
async fn next_text(receiver: &mut SplitStream<WebSocket>) -> Option<String> {
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => return Some(text.as_str().to_string()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
    None
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, race_id: RaceId, identity: Identity) {
    let (mut sender, mut receiver) = socket.split();
    let participant_id = identity.participant_id.clone();
    let mut session = Session::new(
        participant_id.clone(),
        &state.session_settings,
        state.clock.now(),
    );

    // 1. The first frame must be `join`
    let first = tokio::time::timeout(state.session_settings.join_timeout, next_text(&mut receiver)).await;
    match first {
        Ok(Some(text)) => {
            if let Err(e) = session.on_message(&text, state.clock.now()) {
                tracing::warn!("Closing connection of '{}': {}", participant_id, e);
                send_error(&mut sender, ServerMessage::error(ErrorKind::Unknown, e.to_string())).await;
                return;
            }
        }
        Ok(None) => return,
        Err(_) => {
            tracing::info!("'{}' did not join in time", participant_id);
            send_error(
                &mut sender,
                ServerMessage::error(ErrorKind::Unknown, "join timed out"),
            )
            .await;
            return;
        }
    }

    // 2. Attach to the room
    let (tx, rx) = mpsc::unbounded_channel();
    let joined = match state
        .join_race_usecase
        .execute(race_id.clone(), identity, session.id(), tx)
        .await
    {
        Ok(joined) => joined,
        Err(JoinRaceError::Race(e)) => {
            send_error(&mut sender, ServerMessage::from(&e)).await;
            return;
        }
        Err(e) => {
            send_error(&mut sender, ServerMessage::error(ErrorKind::Unknown, e.to_string())).await;
            return;
        }
    };
    session.attach(state.clock.now());
    tracing::info!(
        "Session {} of '{}' attached to race '{}' (reattached: {})",
        session.id(),
        participant_id,
        race_id,
        joined.accepted.reattached
    );

    let room = joined.handle;
    let session_id = session.id();

    // 3. Pump frames both ways until either side ends
    let mut send_task = pusher_loop(rx, sender);
    let mut recv_task = tokio::spawn(recv_loop(receiver, session, room.clone(), state.clone()));

    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // 4. Unlink; the room ignores this if a newer session has taken over
    state
        .leave_race_usecase
        .execute(&room, participant_id, session_id);
}

async fn recv_loop(
    mut receiver: SplitStream<WebSocket>,
    mut session: Session,
    room: RoomHandle,
    state: Arc<AppState>,
) {
    let participant_id = session.participant_id().clone();
    let mut heartbeat = tokio::time::interval(state.session_settings.heartbeat_interval);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            frame = receiver.next() => {
                let message = match frame {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket error from '{}': {}", participant_id, e);
                        break;
                    }
                    None => break,
                };
                match message {
                    Message::Text(text) => match session.on_message(text.as_str(), state.clock.now()) {
                        Ok(InboundEvent::Progress { chars_typed, errors }) => {
                            if !state.record_progress_usecase.execute(
                                &room,
                                participant_id.clone(),
                                session.id(),
                                chars_typed,
                                errors,
                            ) {
                                break;
                            }
                        }
                        Ok(InboundEvent::Start) => {
                            if let Err(e) = state
                                .start_race_usecase
                                .execute(&room, participant_id.clone())
                                .await
                            {
                                tracing::debug!("Start request from '{}' ignored: {}", participant_id, e);
                            }
                        }
                        Ok(InboundEvent::Heartbeat) | Ok(InboundEvent::Join) => {}
                        Err(e) => tracing::warn!("Ignoring frame from '{}': {}", participant_id, e),
                    },
                    Message::Close(_) => {
                        tracing::info!("'{}' closed the connection", participant_id);
                        break;
                    }
                    _ => {}
                }
            }
            _ = heartbeat.tick() => match session.check_heartbeat(state.clock.now()) {
                HeartbeatStatus::Lost { missed } => {
                    tracing::info!("'{}' missed {} heartbeats, detaching", participant_id, missed);
                    break;
                }
                HeartbeatStatus::Late { missed } => {
                    tracing::debug!("'{}' is {} heartbeats late", participant_id, missed);
                }
                HeartbeatStatus::Alive => {}
            }
        }
    }

    session.detach();
}
