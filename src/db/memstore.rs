use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::db::store::{RoomStore, StoreError};
use crate::models::{ChatMessage, Room, RoomPatch};

/// In-memory store for tests and db-less deployments.
///
/// Same observable semantics as the Postgres store, including idempotent
/// participant add/remove and the reclaimable-rooms query.
#[derive(Default)]
pub struct MemStore {
    rooms: RwLock<HashMap<String, Room>>,
    messages: RwLock<Vec<ChatMessage>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for MemStore {
    async fn insert_room(&self, room: Room) -> Result<(), StoreError> {
        self.rooms
            .write()
            .await
            .insert(room.room_id.clone(), room);
        Ok(())
    }

    async fn find_room(&self, room_id: &str) -> Result<Option<Room>, StoreError> {
        Ok(self.rooms.read().await.get(room_id).cloned())
    }

    async fn update_room(
        &self,
        room_id: &str,
        patch: RoomPatch,
    ) -> Result<Option<Room>, StoreError> {
        let mut rooms = self.rooms.write().await;
        match rooms.get_mut(room_id) {
            Some(room) => {
                patch.apply(room);
                Ok(Some(room.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_room(&self, room_id: &str) -> Result<bool, StoreError> {
        Ok(self.rooms.write().await.remove(room_id).is_some())
    }

    async fn append_message(&self, msg: &ChatMessage) -> Result<(), StoreError> {
        self.messages.write().await.push(msg.clone());
        Ok(())
    }

    async fn delete_messages(&self, room_id: &str) -> Result<u64, StoreError> {
        let mut messages = self.messages.write().await;
        let before = messages.len();
        messages.retain(|m| m.room_id != room_id);
        Ok((before - messages.len()) as u64)
    }

    async fn list_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let mut out: Vec<ChatMessage> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.timestamp);
        Ok(out)
    }

    async fn list_reclaimable_rooms(
        &self,
        now: DateTime<Utc>,
        inactivity_threshold: Duration,
    ) -> Result<Vec<Room>, StoreError> {
        let cutoff = now
            - chrono::Duration::from_std(inactivity_threshold)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        let rooms = self.rooms.read().await;
        Ok(rooms
            .values()
            .filter(|room| {
                !room.is_active
                    || room.expires_at.is_some_and(|at| at <= now)
                    || (room.auto_delete && room.last_activity <= cutoff)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours_ago(h: i64) -> DateTime<Utc> {
        Utc::now() - chrono::Duration::hours(h)
    }

    #[tokio::test]
    async fn participant_patch_is_idempotent() {
        let store = MemStore::new();
        store.insert_room(Room::new("r1", "alice")).await.unwrap();

        for _ in 0..2 {
            store
                .update_room(
                    "r1",
                    RoomPatch {
                        add_participant: Some("u1".to_string()),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
        let room = store.find_room("r1").await.unwrap().unwrap();
        assert_eq!(room.participants, vec!["u1".to_string()]);

        store
            .update_room(
                "r1",
                RoomPatch {
                    remove_participant: Some("u1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let room = store.find_room("r1").await.unwrap().unwrap();
        assert!(room.participants.is_empty());
    }

    #[tokio::test]
    async fn reclaimable_covers_expired_inactive_and_half_deleted() {
        let store = MemStore::new();

        let mut expired = Room::new("expired", "a");
        expired.expires_at = Some(hours_ago(1));
        store.insert_room(expired).await.unwrap();

        let mut inactive = Room::new("inactive", "a");
        inactive.last_activity = hours_ago(48);
        store.insert_room(inactive).await.unwrap();

        let mut half_deleted = Room::new("half", "a");
        half_deleted.is_active = false;
        store.insert_room(half_deleted).await.unwrap();

        let mut fresh = Room::new("fresh", "a");
        fresh.auto_delete = false;
        store.insert_room(fresh).await.unwrap();

        let mut found: Vec<String> = store
            .list_reclaimable_rooms(Utc::now(), Duration::from_secs(24 * 3600))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.room_id)
            .collect();
        found.sort();
        assert_eq!(found, vec!["expired", "half", "inactive"]);
    }
}
