use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{ClientRequest, ServerEvent};
use crate::ws::hub::{LeaveCause, RoomHub};
use crate::AppState;

type SharedSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Upgrade the HTTP request to a websocket session.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub.clone()))
}

/// Decrements the live connection gauge when the session ends, however it
/// ends.
struct ConnectionGuard {
    hub: Arc<RoomHub>,
    session_id: Uuid,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let remaining = self.hub.connection_closed();
        info!(
            "🔌 Session {} closed, {} connections remaining",
            self.session_id, remaining
        );
    }
}

/// The session's current room binding. Owned by the connection task alone,
/// so a departure can only be initiated once per binding.
struct Binding {
    room_id: String,
    forward: JoinHandle<()>,
}

async fn handle_socket(socket: WebSocket, hub: Arc<RoomHub>) {
    let session_id = Uuid::new_v4();
    let open = hub.connection_opened();
    info!("🔗 Session {} connected, {} connections open", session_id, open);
    let _guard = ConnectionGuard {
        hub: hub.clone(),
        session_id,
    };

    let (sender, receiver) = socket.split();
    let sender: SharedSender = Arc::new(Mutex::new(sender));

    let mut binding: Option<Binding> = None;
    run_session(session_id, &hub, &sender, receiver, &mut binding).await;

    // Transport gone; tear down whatever the session was still bound to.
    if let Some(bound) = binding.take() {
        bound.forward.abort();
        if let Err(e) = hub
            .leave(session_id, &bound.room_id, LeaveCause::Disconnected)
            .await
        {
            warn!("Disconnect teardown failed for {}: {}", bound.room_id, e);
        }
    }
}

async fn run_session(
    session_id: Uuid,
    hub: &Arc<RoomHub>,
    sender: &SharedSender,
    mut receiver: SplitStream<WebSocket>,
    binding: &mut Option<Binding>,
) {
    while let Some(frame) = receiver.next().await {
        let msg = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("Session {} transport error: {}", session_id, e);
                break;
            }
        };

        let request = match serde_json::from_str::<ClientRequest>(&msg) {
            Ok(request) => request,
            Err(e) => {
                send_event(
                    sender,
                    &ServerEvent::Error {
                        message: format!("Invalid request: {}", e),
                    },
                )
                .await;
                continue;
            }
        };

        match request {
            ClientRequest::Join(req) => {
                // A session holds one binding at a time; joining another
                // room leaves the previous one first.
                if let Some(bound) = binding.take() {
                    bound.forward.abort();
                    let _ = hub.leave(session_id, &bound.room_id, LeaveCause::Left).await;
                }

                match hub.join(session_id, &req).await {
                    Ok(outcome) => {
                        send_event(
                            sender,
                            &ServerEvent::TextUpdate {
                                text_content: outcome.text_content,
                            },
                        )
                        .await;
                        let forward =
                            spawn_forwarder(session_id, outcome.rx, sender.clone());
                        *binding = Some(Binding {
                            room_id: req.room_id,
                            forward,
                        });
                    }
                    Err(e) if e.is_room_gone() => {
                        send_event(
                            sender,
                            &ServerEvent::RoomDeleted {
                                reason: "Room not found or has been deleted.".to_string(),
                            },
                        )
                        .await;
                    }
                    Err(e) => {
                        send_event(
                            sender,
                            &ServerEvent::Error {
                                message: e.to_string(),
                            },
                        )
                        .await;
                    }
                }
            }
            ClientRequest::Leave(_) => {
                // The binding, not the payload, says which room this
                // session is actually in.
                if let Some(bound) = binding.take() {
                    bound.forward.abort();
                    if let Err(e) = hub
                        .leave(session_id, &bound.room_id, LeaveCause::Left)
                        .await
                    {
                        warn!("Leave failed for {}: {}", bound.room_id, e);
                    }
                }
            }
            ClientRequest::SendChat(req) => {
                if let Err(e) = hub.send_chat(session_id, &req).await {
                    send_event(
                        sender,
                        &ServerEvent::Error {
                            message: e.to_string(),
                        },
                    )
                    .await;
                }
            }
            ClientRequest::EditText(req) => {
                if let Err(e) = hub.edit_text(session_id, &req).await {
                    send_event(
                        sender,
                        &ServerEvent::Error {
                            message: e.to_string(),
                        },
                    )
                    .await;
                }
            }
            ClientRequest::RequestSync(req) => match hub.full_sync(session_id, &req.room_id).await {
                Ok((state, text_content)) => {
                    send_event(
                        sender,
                        &ServerEvent::TextSnapshot {
                            state,
                            text_content,
                        },
                    )
                    .await;
                }
                Err(e) => {
                    send_event(
                        sender,
                        &ServerEvent::Error {
                            message: e.to_string(),
                        },
                    )
                    .await;
                }
            },
        }
    }
}

/// Pump room events from the broadcast channel to this session's socket.
///
/// Echo suppression happens here: events whose origin is this session are
/// skipped. A forwarded `room:deleted` is terminal for the binding.
fn spawn_forwarder(
    session_id: Uuid,
    mut rx: tokio::sync::broadcast::Receiver<crate::ws::hub::Outbound>,
    sender: SharedSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(out) => {
                    if out.origin == Some(session_id) {
                        continue;
                    }
                    let terminal = matches!(out.event, ServerEvent::RoomDeleted { .. });
                    send_event(&sender, &out.event).await;
                    if terminal {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Session {} lagged, {} events dropped", session_id, skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn send_event(sender: &SharedSender, event: &ServerEvent) {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            error!("❌ Failed to serialize event: {}", e);
            return;
        }
    };
    if let Err(e) = sender.lock().await.send(Message::Text(json)).await {
        warn!("Failed to deliver event: {}", e);
    }
}
