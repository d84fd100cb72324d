use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::db::store::RoomStore;
use crate::models::{Room, RoomError, RoomPatch};
use crate::ws::hub::RoomHub;

/// Reclaims rooms whose lifetime has ended, independent of live traffic.
///
/// The sweep and the explicit force-delete entry point share one deletion
/// procedure, so a user-triggered deletion and a timer-triggered one are
/// indistinguishable to connected clients.
pub struct CleanupService {
    store: Arc<dyn RoomStore>,
    hub: Arc<RoomHub>,
    inactivity_threshold: Duration,
}

impl CleanupService {
    pub fn new(
        store: Arc<dyn RoomStore>,
        hub: Arc<RoomHub>,
        inactivity_threshold: Duration,
    ) -> Self {
        Self {
            store,
            hub,
            inactivity_threshold,
        }
    }

    /// Delete a room and all its associated data.
    ///
    /// Step order matters:
    /// 1. mark the room inactive, so a racing join fails fast;
    /// 2. delete its durable chat messages;
    /// 3. notify and evict still-connected members, while the room id can
    ///    still be resolved;
    /// 4. delete the room record itself.
    ///
    /// Safe to retry: a room that is already gone counts as success, and a
    /// half-deleted room (inactive but still present) is picked up again by
    /// the next sweep pass.
    pub async fn delete_room(&self, room_id: &str, reason: &str) -> Result<(), RoomError> {
        let marked = self
            .store
            .update_room(
                room_id,
                RoomPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await?;

        if marked.is_none() {
            // Already gone; still evict any sessions left pointing at it.
            self.hub.broadcast_deletion(room_id, reason).await;
            info!("Room {} already deleted", room_id);
            return Ok(());
        }

        let purged = self.store.delete_messages(room_id).await?;
        info!("🗑️ Deleted {} messages from room {}", purged, room_id);

        let evicted = self.hub.broadcast_deletion(room_id, reason).await;
        if evicted > 0 {
            info!("Evicted {} live sessions from room {}", evicted, room_id);
        }

        self.store.delete_room(room_id).await?;
        info!("✅ Room {} completely deleted", room_id);
        Ok(())
    }

    /// Run one sweep pass; returns the number of rooms fully reclaimed.
    ///
    /// A single room's failure is logged and does not block the rest of the
    /// pass; it stays eligible for the next one.
    pub async fn cleanup_tick(&self) -> usize {
        let now = Utc::now();
        let candidates = match self
            .store
            .list_reclaimable_rooms(now, self.inactivity_threshold)
            .await
        {
            Ok(rooms) => rooms,
            Err(e) => {
                error!("❌ Cleanup sweep could not list rooms: {}", e);
                return 0;
            }
        };

        if !candidates.is_empty() {
            info!("🧹 Found {} rooms to clean up", candidates.len());
        }

        let mut reclaimed = 0;
        for room in candidates {
            let reason = reclaim_reason(&room, now);
            match self.delete_room(&room.room_id, reason).await {
                Ok(()) => reclaimed += 1,
                Err(e) => warn!("Failed to clean up room {}: {}", room.room_id, e),
            }
        }

        if reclaimed > 0 {
            info!("✅ Cleaned up {} rooms", reclaimed);
        }
        reclaimed
    }

    /// Drive `cleanup_tick` on a fixed interval until the process exits.
    pub fn spawn_sweep(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.cleanup_tick().await;
            }
        })
    }
}

fn reclaim_reason(room: &Room, now: DateTime<Utc>) -> &'static str {
    if room.expires_at.is_some_and(|at| at <= now) {
        "Room expired"
    } else if room.is_active {
        "Room deleted due to inactivity"
    } else {
        "Room deleted"
    }
}
