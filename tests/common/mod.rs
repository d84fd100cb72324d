#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use texloop_rooms::auth::OpaqueProofVerifier;
use texloop_rooms::db::{MemStore, RoomStore};
use texloop_rooms::models::{JoinRequest, Room};
use texloop_rooms::services::cleanup_service::CleanupService;
use texloop_rooms::ws::hub::{HubConfig, RoomHub};

pub struct Fixture {
    pub store: Arc<MemStore>,
    pub hub: Arc<RoomHub>,
    pub cleanup: Arc<CleanupService>,
}

pub fn fixture() -> Fixture {
    fixture_with(HubConfig::default())
}

pub fn fixture_with(cfg: HubConfig) -> Fixture {
    let store = Arc::new(MemStore::new());
    let hub = RoomHub::new(
        store.clone() as Arc<dyn RoomStore>,
        Arc::new(OpaqueProofVerifier),
        cfg,
    );
    let cleanup = Arc::new(CleanupService::new(
        store.clone() as Arc<dyn RoomStore>,
        hub.clone(),
        Duration::from_secs(24 * 3600),
    ));
    Fixture {
        store,
        hub,
        cleanup,
    }
}

pub async fn seed_room(store: &MemStore, room_id: &str) -> Room {
    let room = Room::new(room_id, "creator");
    store.insert_room(room.clone()).await.unwrap();
    room
}

pub fn join_req(room_id: &str, user_id: &str, username: &str) -> JoinRequest {
    JoinRequest {
        room_id: room_id.to_string(),
        user_id: user_id.to_string(),
        username: username.to_string(),
        password: None,
    }
}
