use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved author id for coordinator-synthesized messages.
pub const SYSTEM_USER_ID: &str = "system";
/// Display name shown for coordinator-synthesized messages.
pub const SYSTEM_USERNAME: &str = "System";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    System,
}

/// A chat message, durable and append-only per room.
///
/// `System` messages (join/leave/disconnect notices) are synthesized by the
/// coordinator and never attributable to a real participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub room_id: String,
    pub user_id: String,
    pub username: String,
    pub body: String,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// A message authored by a participant.
    pub fn user(
        room_id: impl Into<String>,
        user_id: impl Into<String>,
        username: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id: room_id.into(),
            user_id: user_id.into(),
            username: username.into(),
            body: body.into(),
            kind: MessageKind::User,
            timestamp: Utc::now(),
        }
    }

    /// A coordinator-synthesized notice ("X joined the room", ...).
    pub fn system(room_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id: room_id.into(),
            user_id: SYSTEM_USER_ID.to_string(),
            username: SYSTEM_USERNAME.to_string(),
            body: body.into(),
            kind: MessageKind::System,
            timestamp: Utc::now(),
        }
    }
}
