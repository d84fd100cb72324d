use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::models::{ChatMessage, Room, RoomError, RoomPatch};

/// Durable-store failures. All of these are transient from the
/// coordinator's point of view and safe to retry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
}

impl From<StoreError> for RoomError {
    fn from(e: StoreError) -> Self {
        RoomError::StoreUnavailable(e.to_string())
    }
}

/// The durable store the coordinator runs against.
///
/// The store is the long-term source of truth; everything the coordinator
/// keeps in memory is a cache rebuildable from these operations.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn insert_room(&self, room: Room) -> Result<(), StoreError>;

    async fn find_room(&self, room_id: &str) -> Result<Option<Room>, StoreError>;

    /// Apply a partial update; returns the updated room, or `None` when the
    /// room no longer exists.
    async fn update_room(&self, room_id: &str, patch: RoomPatch)
        -> Result<Option<Room>, StoreError>;

    /// Returns whether a row was actually removed. Removing an absent room
    /// is not an error, so deletion retries stay idempotent.
    async fn delete_room(&self, room_id: &str) -> Result<bool, StoreError>;

    async fn append_message(&self, msg: &ChatMessage) -> Result<(), StoreError>;

    /// Purge the room's chat history; returns the number of messages removed.
    async fn delete_messages(&self, room_id: &str) -> Result<u64, StoreError>;

    /// Chat history in timestamp order.
    async fn list_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>, StoreError>;

    /// Rooms eligible for reclamation: expired (`expires_at <= now`),
    /// inactive (`auto_delete` and `last_activity` older than the
    /// threshold), or half-deleted (`is_active == false` but still present,
    /// the at-least-once retry case).
    async fn list_reclaimable_rooms(
        &self,
        now: DateTime<Utc>,
        inactivity_threshold: Duration,
    ) -> Result<Vec<Room>, StoreError>;
}
