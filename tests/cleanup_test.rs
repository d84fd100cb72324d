mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use texloop_rooms::auth::OpaqueProofVerifier;
use texloop_rooms::db::store::{RoomStore, StoreError};
use texloop_rooms::db::MemStore;
use texloop_rooms::models::{ChatMessage, Room, RoomPatch, SendChatRequest, ServerEvent};
use texloop_rooms::services::cleanup_service::CleanupService;
use texloop_rooms::ws::hub::{HubConfig, Outbound, RoomHub};

use common::{fixture, join_req, seed_room};

/// Count terminal events until the room's channel closes.
async fn deletion_events(mut rx: tokio::sync::broadcast::Receiver<Outbound>) -> Vec<String> {
    let mut reasons = Vec::new();
    while let Ok(result) = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
        match result {
            Ok(out) => {
                if let ServerEvent::RoomDeleted { reason } = out.event {
                    reasons.push(reason);
                }
            }
            Err(_) => break,
        }
    }
    reasons
}

#[tokio::test]
async fn expired_room_is_fully_reclaimed() {
    let f = fixture();
    let mut room = Room::new("doomed", "creator");
    room.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
    f.store.insert_room(room).await.unwrap();

    let member = f
        .hub
        .join(Uuid::new_v4(), &join_req("doomed", "u1", "Ann"))
        .await
        .unwrap();

    let reclaimed = f.cleanup.cleanup_tick().await;
    assert_eq!(reclaimed, 1);

    assert!(f.store.find_room("doomed").await.unwrap().is_none());
    assert!(f.store.list_messages("doomed").await.unwrap().is_empty());

    let reasons = deletion_events(member.rx).await;
    assert_eq!(reasons, vec!["Room expired".to_string()]);
}

#[tokio::test]
async fn inactive_room_is_reclaimed_even_with_participants() {
    let f = fixture();
    let mut room = Room::new("stale", "creator");
    room.last_activity = Utc::now() - chrono::Duration::hours(48);
    room.participants = vec!["u1".to_string(), "u2".to_string()];
    f.store.insert_room(room).await.unwrap();

    let reclaimed = f.cleanup.cleanup_tick().await;
    assert_eq!(reclaimed, 1);
    assert!(f.store.find_room("stale").await.unwrap().is_none());
}

#[tokio::test]
async fn half_deleted_room_is_picked_up_by_the_next_pass() {
    let f = fixture();
    let mut room = Room::new("half", "creator");
    room.is_active = false;
    f.store.insert_room(room).await.unwrap();

    let reclaimed = f.cleanup.cleanup_tick().await;
    assert_eq!(reclaimed, 1);
    assert!(f.store.find_room("half").await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_an_absent_room_succeeds() {
    let f = fixture();
    assert!(f.cleanup.delete_room("ghost", "Room deleted").await.is_ok());
}

#[tokio::test]
async fn deletion_purges_the_chat_history() {
    let f = fixture();
    seed_room(&f.store, "r1").await;

    let ann = Uuid::new_v4();
    f.hub.join(ann, &join_req("r1", "u1", "Ann")).await.unwrap();
    f.hub
        .send_chat(
            ann,
            &SendChatRequest {
                room_id: "r1".to_string(),
                user_id: "u1".to_string(),
                username: "Ann".to_string(),
                body: "soon to vanish".to_string(),
            },
        )
        .await
        .unwrap();
    assert!(!f.store.list_messages("r1").await.unwrap().is_empty());

    f.cleanup.delete_room("r1", "Room deleted").await.unwrap();
    assert!(f.store.find_room("r1").await.unwrap().is_none());
    assert!(f.store.list_messages("r1").await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_deletions_send_one_terminal_event() {
    let f = fixture();
    seed_room(&f.store, "r1").await;

    let member = f
        .hub
        .join(Uuid::new_v4(), &join_req("r1", "u1", "Ann"))
        .await
        .unwrap();

    // A force-delete racing a sweep pass over the same room.
    let (a, b) = tokio::join!(
        f.cleanup.delete_room("r1", "Room deleted"),
        f.cleanup.delete_room("r1", "Room deleted"),
    );
    a.unwrap();
    b.unwrap();

    let reasons = deletion_events(member.rx).await;
    assert_eq!(reasons.len(), 1, "members must see exactly one room:deleted");
}

/// Delegates to an in-memory store but refuses to purge one room's messages.
struct StuckRoomStore {
    inner: MemStore,
    stuck_room: String,
}

#[async_trait]
impl RoomStore for StuckRoomStore {
    async fn insert_room(&self, room: Room) -> Result<(), StoreError> {
        self.inner.insert_room(room).await
    }
    async fn find_room(&self, room_id: &str) -> Result<Option<Room>, StoreError> {
        self.inner.find_room(room_id).await
    }
    async fn update_room(
        &self,
        room_id: &str,
        patch: RoomPatch,
    ) -> Result<Option<Room>, StoreError> {
        self.inner.update_room(room_id, patch).await
    }
    async fn delete_room(&self, room_id: &str) -> Result<bool, StoreError> {
        self.inner.delete_room(room_id).await
    }
    async fn append_message(&self, msg: &ChatMessage) -> Result<(), StoreError> {
        self.inner.append_message(msg).await
    }
    async fn delete_messages(&self, room_id: &str) -> Result<u64, StoreError> {
        if room_id == self.stuck_room {
            return Err(StoreError::Database("injected outage".to_string()));
        }
        self.inner.delete_messages(room_id).await
    }
    async fn list_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        self.inner.list_messages(room_id).await
    }
    async fn list_reclaimable_rooms(
        &self,
        now: DateTime<Utc>,
        inactivity_threshold: Duration,
    ) -> Result<Vec<Room>, StoreError> {
        self.inner.list_reclaimable_rooms(now, inactivity_threshold).await
    }
}

#[tokio::test]
async fn one_failing_room_does_not_block_the_pass() {
    let store = Arc::new(StuckRoomStore {
        inner: MemStore::new(),
        stuck_room: "bad".to_string(),
    });
    let hub = RoomHub::new(
        store.clone() as Arc<dyn RoomStore>,
        Arc::new(OpaqueProofVerifier),
        HubConfig::default(),
    );
    let cleanup = CleanupService::new(
        store.clone() as Arc<dyn RoomStore>,
        hub,
        Duration::from_secs(24 * 3600),
    );

    for id in ["bad", "good"] {
        let mut room = Room::new(id, "creator");
        room.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
        store.insert_room(room).await.unwrap();
    }

    let reclaimed = cleanup.cleanup_tick().await;
    assert_eq!(reclaimed, 1);
    assert!(store.find_room("good").await.unwrap().is_none());
    // Still marked inactive, eligible for the next pass.
    let bad = store.find_room("bad").await.unwrap().unwrap();
    assert!(!bad.is_active);
}

#[tokio::test]
async fn join_after_deletion_is_reported_as_gone() {
    let f = fixture();
    seed_room(&f.store, "r1").await;
    f.cleanup.delete_room("r1", "Room deleted").await.unwrap();

    let err = f
        .hub
        .join(Uuid::new_v4(), &join_req("r1", "u1", "Ann"))
        .await
        .unwrap_err();
    assert!(err.is_room_gone());
    assert_eq!(f.hub.subscriber_count("r1").await, 0);
}
