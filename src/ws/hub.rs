use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::CredentialVerifier;
use crate::db::store::RoomStore;
use crate::models::{
    ChatMessage, EditTextRequest, JoinRequest, Room, RoomError, RoomPatch, SendChatRequest,
    ServerEvent,
};
use crate::services::rate_limit_service::RateLimiter;
use crate::ws::channel::{EditOutcome, EditStrategy, RoomDoc};

/// Tuning knobs for the hub, derived from [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub max_text_length: usize,
    pub max_message_length: usize,
    pub join_rate_limit: u32,
    pub chat_rate_limit: u32,
    pub rate_limit_window: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_text_length: 50_000,
            max_message_length: 1_000,
            join_rate_limit: 10,
            chat_rate_limit: 30,
            rate_limit_window: Duration::from_secs(60),
        }
    }
}

/// A room-scoped event plus the session it originated from.
///
/// `origin` drives echo suppression: forwarders skip events whose origin is
/// their own session. Events meant for everyone carry `None`.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub origin: Option<Uuid>,
    pub event: ServerEvent,
}

/// Why a session is being unbound from its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveCause {
    Left,
    Disconnected,
}

impl LeaveCause {
    fn notice(self, username: &str) -> String {
        match self {
            LeaveCause::Left => format!("{} left the room", username),
            LeaveCause::Disconnected => format!("{} disconnected", username),
        }
    }
}

/// Everything a freshly joined session needs to get going.
#[derive(Debug)]
pub struct JoinOutcome {
    /// Subscribed before the join events were published, so the joiner sees
    /// its own `user:joined`.
    pub rx: broadcast::Receiver<Outbound>,
    /// Flattened document for the initial render.
    pub text_content: String,
    pub participants: Vec<String>,
}

struct Member {
    user_id: String,
    username: String,
}

/// Mutable per-room state; every field is touched only under the room lock.
struct RoomInner {
    /// Live subscriber set
    sessions: HashMap<Uuid, Member>,
    /// Cached mirror of the durable participant list
    participants: Vec<String>,
    doc: RoomDoc,
    strategy: EditStrategy,
    /// Latched by the first deletion broadcast; everything after is a no-op
    deleted: bool,
}

/// One live room: the serialization point plus the fanout channel.
///
/// Publishing happens while holding `inner`, so every subscriber observes
/// the room's events in the exact order its requests were accepted.
pub struct RoomHandle {
    tx: broadcast::Sender<Outbound>,
    inner: Mutex<RoomInner>,
}

/// The room session coordinator.
///
/// Tracks which sessions belong to which room, serializes all mutations per
/// room, and fans room events out to every subscriber. Holds no authority:
/// everything here is a cache over the durable store and is rebuilt from it
/// after a restart.
pub struct RoomHub {
    store: Arc<dyn RoomStore>,
    verifier: Arc<dyn CredentialVerifier>,
    rooms: RwLock<HashMap<String, Arc<RoomHandle>>>,
    limiter: RateLimiter,
    cfg: HubConfig,
    active_connections: AtomicUsize,
}

impl RoomHub {
    pub fn new(
        store: Arc<dyn RoomStore>,
        verifier: Arc<dyn CredentialVerifier>,
        cfg: HubConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            verifier,
            rooms: RwLock::new(HashMap::new()),
            limiter: RateLimiter::new(cfg.rate_limit_window),
            cfg,
            active_connections: AtomicUsize::new(0),
        })
    }

    pub fn connection_opened(&self) -> usize {
        self.active_connections.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn connection_closed(&self) -> usize {
        self.active_connections.fetch_sub(1, Ordering::Relaxed) - 1
    }

    /// Bind a session to a room.
    ///
    /// Re-joining with a `user_id` that is already present (a second live
    /// connection for the same user) re-subscribes the session but adds no
    /// duplicate participant and emits no second "joined" notice.
    pub async fn join(
        &self,
        session_id: Uuid,
        req: &JoinRequest,
    ) -> Result<JoinOutcome, RoomError> {
        if self
            .limiter
            .hit(&format!("join:{}", session_id), self.cfg.join_rate_limit)
        {
            return Err(RoomError::RateLimited);
        }

        let room = self
            .store
            .find_room(&req.room_id)
            .await?
            .ok_or(RoomError::RoomNotFound)?;
        if !room.is_active {
            return Err(RoomError::RoomInactiveOrExpired);
        }
        if room.is_private {
            let proof = room.password_proof.as_deref().unwrap_or_default();
            let supplied = req.password.as_deref().ok_or(RoomError::Unauthorized)?;
            if !self.verifier.verify(supplied, proof) {
                return Err(RoomError::Unauthorized);
            }
        }

        let handle = self.room_handle(&room).await;
        let mut inner = handle.inner.lock().await;
        if inner.deleted {
            return Err(RoomError::RoomInactiveOrExpired);
        }
        // Deletion marks the room inactive before anything else, so this
        // re-check under the room lock closes the join/delete race. When it
        // fails, a handle created by this very join must not stay in the
        // map, or later writes would land in a dead room.
        let still_active = match self.store.find_room(&req.room_id).await {
            Ok(row) => row.is_some_and(|r| r.is_active),
            Err(e) => {
                self.discard_idle_handle(&req.room_id, &handle, &inner).await;
                return Err(e.into());
            }
        };
        if !still_active {
            self.discard_idle_handle(&req.room_id, &handle, &inner).await;
            return Err(RoomError::RoomInactiveOrExpired);
        }

        let newly_joined = !inner.participants.contains(&req.user_id);
        if newly_joined {
            if let Err(e) = self
                .store
                .update_room(
                    &req.room_id,
                    RoomPatch {
                        add_participant: Some(req.user_id.clone()),
                        last_activity: Some(Utc::now()),
                        ..Default::default()
                    },
                )
                .await
            {
                self.discard_idle_handle(&req.room_id, &handle, &inner).await;
                return Err(e.into());
            }
            inner.participants.push(req.user_id.clone());
        }

        inner.sessions.insert(
            session_id,
            Member {
                user_id: req.user_id.clone(),
                username: req.username.clone(),
            },
        );

        let rx = handle.tx.subscribe();
        Self::publish(
            &handle,
            None,
            ServerEvent::UserJoined {
                user_id: req.user_id.clone(),
                username: req.username.clone(),
            },
        );
        if newly_joined {
            let notice =
                ChatMessage::system(&req.room_id, format!("{} joined the room", req.username));
            if let Err(e) = self.store.append_message(&notice).await {
                warn!("Failed to persist join notice for {}: {}", req.room_id, e);
            }
            Self::publish(&handle, None, ServerEvent::ChatNew { message: notice });
        }
        Self::publish(
            &handle,
            None,
            ServerEvent::ParticipantsUpdate {
                participants: inner.participants.clone(),
            },
        );

        info!("👤 {} joined room {}", req.username, req.room_id);
        Ok(JoinOutcome {
            rx,
            text_content: inner.doc.contents(),
            participants: inner.participants.clone(),
        })
    }

    /// Unbind a session from its room, explicitly or on disconnect.
    ///
    /// No-op (never an error) when the session is already unbound, which
    /// makes an explicit leave racing a transport disconnect converge on
    /// exactly one departure cycle.
    pub async fn leave(
        &self,
        session_id: Uuid,
        room_id: &str,
        cause: LeaveCause,
    ) -> Result<(), RoomError> {
        let Some(handle) = self.handle_for(room_id).await else {
            return Ok(());
        };
        let mut inner = handle.inner.lock().await;
        let Some(member) = inner.sessions.remove(&session_id) else {
            return Ok(());
        };
        if inner.deleted {
            return Ok(());
        }

        // The user may still be present through another connection.
        let still_connected = inner
            .sessions
            .values()
            .any(|m| m.user_id == member.user_id);
        if still_connected {
            return Ok(());
        }

        inner.participants.retain(|p| p != &member.user_id);

        // Store failures here are logged, not fatal: the departure must
        // complete, and durable state converges on the next sweep cycle.
        if let Err(e) = self
            .store
            .update_room(
                room_id,
                RoomPatch {
                    remove_participant: Some(member.user_id.clone()),
                    last_activity: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
        {
            warn!("Failed to remove participant from {}: {}", room_id, e);
        }

        let notice = ChatMessage::system(room_id, cause.notice(&member.username));
        if let Err(e) = self.store.append_message(&notice).await {
            warn!("Failed to persist leave notice for {}: {}", room_id, e);
        }

        Self::publish(
            &handle,
            None,
            ServerEvent::UserLeft {
                user_id: member.user_id.clone(),
                username: member.username.clone(),
            },
        );
        Self::publish(&handle, None, ServerEvent::ChatNew { message: notice });
        Self::publish(
            &handle,
            None,
            ServerEvent::ParticipantsUpdate {
                participants: inner.participants.clone(),
            },
        );

        info!("👋 {} left room {} ({:?})", member.username, room_id, cause);
        Ok(())
    }

    /// Persist and fan out a chat message to every member, sender included.
    pub async fn send_chat(
        &self,
        session_id: Uuid,
        req: &SendChatRequest,
    ) -> Result<(), RoomError> {
        if self
            .limiter
            .hit(&format!("chat:{}", session_id), self.cfg.chat_rate_limit)
        {
            return Err(RoomError::RateLimited);
        }
        if req.body.chars().count() > self.cfg.max_message_length {
            return Err(RoomError::PayloadTooLarge);
        }

        let handle = self
            .handle_for(&req.room_id)
            .await
            .ok_or(RoomError::RoomNotFound)?;
        let inner = handle.inner.lock().await;
        if inner.deleted {
            return Err(RoomError::RoomInactiveOrExpired);
        }
        if !inner.sessions.contains_key(&session_id) {
            return Err(RoomError::NotAMember);
        }

        let message = ChatMessage::user(&req.room_id, &req.user_id, &req.username, &req.body);
        self.store.append_message(&message).await?;
        if let Err(e) = self
            .store
            .update_room(
                &req.room_id,
                RoomPatch {
                    last_activity: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
        {
            warn!("Failed to bump activity for {}: {}", req.room_id, e);
        }

        Self::publish(&handle, None, ServerEvent::ChatNew { message });
        Ok(())
    }

    /// Apply an edit through the room's strategy and broadcast the result.
    ///
    /// Live-sync rooms re-broadcast the raw operation to everyone except
    /// the origin; overwrite rooms broadcast the full text to everyone
    /// including the sender, as a persistence ack.
    pub async fn edit_text(
        &self,
        session_id: Uuid,
        req: &EditTextRequest,
    ) -> Result<(), RoomError> {
        let handle = self
            .handle_for(&req.room_id)
            .await
            .ok_or(RoomError::RoomNotFound)?;
        let mut inner = handle.inner.lock().await;
        if inner.deleted {
            return Err(RoomError::RoomInactiveOrExpired);
        }
        if !inner.sessions.contains_key(&session_id) {
            return Err(RoomError::NotAMember);
        }

        let strategy = inner.strategy;
        let outcome = strategy
            .apply(
                &mut inner.doc,
                req.operation.as_deref(),
                req.full_text.as_deref(),
                self.cfg.max_text_length,
            )
            .map_err(RoomError::InvalidOperation)?;

        match outcome {
            EditOutcome::Operation {
                update,
                correction,
                text_content,
            } => {
                self.store
                    .update_room(
                        &req.room_id,
                        RoomPatch {
                            text_content: Some(text_content),
                            last_activity: Some(Utc::now()),
                            ..Default::default()
                        },
                    )
                    .await?;
                Self::publish(
                    &handle,
                    Some(session_id),
                    ServerEvent::TextOperation { operation: update },
                );
                if let Some(correction) = correction {
                    // The origin applied the oversize edit locally, so the
                    // trim must reach it too.
                    Self::publish(&handle, None, ServerEvent::TextOperation {
                        operation: correction,
                    });
                }
            }
            EditOutcome::Overwrite { text_content } => {
                self.store
                    .update_room(
                        &req.room_id,
                        RoomPatch {
                            text_content: Some(text_content.clone()),
                            last_activity: Some(Utc::now()),
                            ..Default::default()
                        },
                    )
                    .await?;
                Self::publish(&handle, None, ServerEvent::TextUpdate { text_content });
            }
            EditOutcome::Unchanged => {}
        }
        Ok(())
    }

    /// Full document state for a session bootstrapping or re-syncing its
    /// replica. Point-to-point; never broadcast. Members only.
    pub async fn full_sync(
        &self,
        session_id: Uuid,
        room_id: &str,
    ) -> Result<(Vec<u8>, String), RoomError> {
        let handle = self
            .handle_for(room_id)
            .await
            .ok_or(RoomError::RoomNotFound)?;
        let inner = handle.inner.lock().await;
        if inner.deleted {
            return Err(RoomError::RoomInactiveOrExpired);
        }
        if !inner.sessions.contains_key(&session_id) {
            return Err(RoomError::NotAMember);
        }
        let state = inner.doc.snapshot().map_err(RoomError::InvalidOperation)?;
        Ok((state, inner.doc.contents()))
    }

    /// Terminal eviction used by the cleanup sweep and force-deletion.
    ///
    /// Sends exactly one `room:deleted` to every current subscriber (the
    /// `deleted` latch dedupes concurrent callers), then clears the
    /// subscriber set without per-user departure notices, since the room is
    /// gone. Returns the number of sessions evicted.
    pub async fn broadcast_deletion(&self, room_id: &str, reason: &str) -> usize {
        let Some(handle) = self.handle_for(room_id).await else {
            return 0;
        };
        let evicted = {
            let mut inner = handle.inner.lock().await;
            if inner.deleted {
                0
            } else {
                inner.deleted = true;
                Self::publish(
                    &handle,
                    None,
                    ServerEvent::RoomDeleted {
                        reason: reason.to_string(),
                    },
                );
                let evicted = inner.sessions.len();
                inner.sessions.clear();
                inner.participants.clear();
                evicted
            }
        };
        self.rooms.write().await.remove(room_id);
        evicted
    }

    /// Snapshot of the live subscriber count for a room, mainly for tests
    /// and diagnostics.
    pub async fn subscriber_count(&self, room_id: &str) -> usize {
        match self.handle_for(room_id).await {
            Some(handle) => handle.inner.lock().await.sessions.len(),
            None => 0,
        }
    }

    fn publish(handle: &RoomHandle, origin: Option<Uuid>, event: ServerEvent) {
        // No receivers is fine; the event is simply dropped.
        let _ = handle.tx.send(Outbound { origin, event });
    }

    async fn handle_for(&self, room_id: &str) -> Option<Arc<RoomHandle>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Drop a handle from the map after a failed join, but only while no
    /// session holds it and only if the map still points at this exact
    /// handle (a concurrent join may have re-created the room).
    async fn discard_idle_handle(
        &self,
        room_id: &str,
        handle: &Arc<RoomHandle>,
        inner: &RoomInner,
    ) {
        if !inner.sessions.is_empty() {
            return;
        }
        let mut rooms = self.rooms.write().await;
        if rooms
            .get(room_id)
            .is_some_and(|current| Arc::ptr_eq(current, handle))
        {
            rooms.remove(room_id);
        }
    }

    /// Get or lazily create the live state for a room, seeding the document
    /// replica and participant cache from the durable row.
    async fn room_handle(&self, room: &Room) -> Arc<RoomHandle> {
        if let Some(handle) = self.handle_for(&room.room_id).await {
            return handle;
        }
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room.room_id.clone())
            .or_insert_with(|| {
                let (tx, _rx) = broadcast::channel::<Outbound>(256);
                Arc::new(RoomHandle {
                    tx,
                    inner: Mutex::new(RoomInner {
                        sessions: HashMap::new(),
                        participants: room.participants.clone(),
                        doc: RoomDoc::new(&room.text_content),
                        strategy: EditStrategy::for_room(room.live_sync),
                        deleted: false,
                    }),
                })
            })
            .clone()
    }
}
