use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A room as it lives in the durable store.
///
/// The coordinator only ever holds a cached view of this; the store is the
/// source of truth and the in-memory state must be rebuildable from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Unique, immutable after creation
    pub room_id: String,
    pub name: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Absolute destruction deadline, if the room has one
    pub expires_at: Option<DateTime<Utc>>,
    /// Bumped by any join, edit or chat send
    pub last_activity: DateTime<Utc>,
    /// False once logical deletion has started
    pub is_active: bool,
    /// Opt-in to reclamation after the inactivity threshold
    pub auto_delete: bool,
    /// Durable mirror of the users currently joined
    pub participants: Vec<String>,
    /// Flattened document content, bounded by the configured maximum
    pub text_content: String,
    /// Live CRDT sync vs plain overwrite editing
    pub live_sync: bool,
    pub is_private: bool,
    /// Opaque verification token from the external hashing layer.
    /// Never the raw credential.
    pub password_proof: Option<String>,
}

impl Room {
    /// A fresh public room with defaults matching the store schema.
    pub fn new(room_id: impl Into<String>, created_by: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            room_id: room_id.into(),
            name: None,
            created_by: created_by.into(),
            created_at: now,
            expires_at: None,
            last_activity: now,
            is_active: true,
            auto_delete: true,
            participants: Vec::new(),
            text_content: String::new(),
            live_sync: true,
            is_private: false,
            password_proof: None,
        }
    }
}

/// Partial update applied to a stored room. `None` fields are left untouched.
///
/// `add_participant` is a set-add (no duplicates); `remove_participant` is a
/// set-remove. Both are idempotent.
#[derive(Debug, Default, Clone)]
pub struct RoomPatch {
    pub is_active: Option<bool>,
    pub last_activity: Option<DateTime<Utc>>,
    pub text_content: Option<String>,
    pub add_participant: Option<String>,
    pub remove_participant: Option<String>,
}

impl RoomPatch {
    /// Apply this patch to an in-memory room. Shared by the in-memory store
    /// and by tests; the Postgres store expresses the same semantics in SQL.
    pub fn apply(&self, room: &mut Room) {
        if let Some(is_active) = self.is_active {
            room.is_active = is_active;
        }
        if let Some(last_activity) = self.last_activity {
            room.last_activity = last_activity;
        }
        if let Some(ref text_content) = self.text_content {
            room.text_content = text_content.clone();
        }
        if let Some(ref user_id) = self.add_participant {
            if !room.participants.contains(user_id) {
                room.participants.push(user_id.clone());
            }
        }
        if let Some(ref user_id) = self.remove_participant {
            room.participants.retain(|p| p != user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_participant_is_a_set_add() {
        let mut room = Room::new("r1", "alice");
        let patch = RoomPatch {
            add_participant: Some("u1".to_string()),
            ..Default::default()
        };
        patch.apply(&mut room);
        patch.apply(&mut room);
        assert_eq!(room.participants, vec!["u1".to_string()]);
    }

    #[test]
    fn remove_participant_tolerates_absence() {
        let mut room = Room::new("r1", "alice");
        let patch = RoomPatch {
            remove_participant: Some("ghost".to_string()),
            ..Default::default()
        };
        patch.apply(&mut room);
        assert!(room.participants.is_empty());
    }
}
