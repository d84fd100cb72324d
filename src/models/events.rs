use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

use crate::models::ChatMessage;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub room_id: String,
    pub user_id: String,
    pub username: String,
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub room_id: String,
    pub user_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SendChatRequest {
    pub room_id: String,
    pub user_id: String,
    pub username: String,
    pub body: String,
}

/// An edit carries either an incremental CRDT operation (live-sync rooms)
/// or the full proposed text (overwrite rooms, or live-sync clients that
/// let the server compute the diff).
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EditTextRequest {
    pub room_id: String,
    #[serde_as(as = "Option<Base64>")]
    #[serde(default)]
    pub operation: Option<Vec<u8>>,
    #[serde(default)]
    pub full_text: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub room_id: String,
}

/// Requests a client may issue over the persistent connection.
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ClientRequest {
    #[serde(rename = "room:join")]
    Join(JoinRequest),
    #[serde(rename = "room:leave")]
    Leave(LeaveRequest),
    #[serde(rename = "chat:send")]
    SendChat(SendChatRequest),
    #[serde(rename = "text:edit")]
    EditText(EditTextRequest),
    #[serde(rename = "text:sync-request")]
    RequestSync(SyncRequest),
}

/// Room-scoped events delivered server-to-client.
///
/// The closed catalogue: every payload shape is fixed per kind and
/// validated at the serialization boundary.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Delivered to all members, including the joiner.
    #[serde(rename = "user:joined", rename_all = "camelCase")]
    UserJoined { user_id: String, username: String },

    /// Delivered to all remaining members.
    #[serde(rename = "user:left", rename_all = "camelCase")]
    UserLeft { user_id: String, username: String },

    /// Ordered per room; delivered to all members including the sender.
    #[serde(rename = "chat:new")]
    ChatNew { message: ChatMessage },

    /// Full snapshot; supersedes any prior value, never a delta.
    #[serde(rename = "participants:update")]
    ParticipantsUpdate { participants: Vec<String> },

    /// Incremental CRDT operation. Skips the origin session, except for
    /// length-limit corrections which go to everyone.
    #[serde(rename = "text:operation")]
    TextOperation {
        #[serde_as(as = "Base64")]
        operation: Vec<u8>,
    },

    /// Full text for overwrite-mode rooms, broadcast to everyone including
    /// the sender as a persistence ack. Also the initial state on join.
    #[serde(rename = "text:update", rename_all = "camelCase")]
    TextUpdate { text_content: String },

    /// Point-to-point reply to a sync request: full document state, no
    /// operation-log replay.
    #[serde(rename = "text:snapshot", rename_all = "camelCase")]
    TextSnapshot {
        #[serde_as(as = "Base64")]
        state: Vec<u8>,
        text_content: String,
    },

    /// Terminal: no further events follow for this room on this connection.
    #[serde(rename = "room:deleted")]
    RoomDeleted { reason: String },

    /// Point-to-point to the session that caused the failing request.
    #[serde(rename = "error")]
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_request_round_trips_tagged_json() {
        let raw = r#"{"type":"room:join","roomId":"r1","userId":"u1","username":"Ann"}"#;
        let req: ClientRequest = serde_json::from_str(raw).unwrap();
        match req {
            ClientRequest::Join(join) => {
                assert_eq!(join.room_id, "r1");
                assert_eq!(join.password, None);
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn text_operation_is_base64_on_the_wire() {
        let event = ServerEvent::TextOperation {
            operation: vec![1, 2, 3],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"text:operation\""));
        assert!(json.contains("AQID"));
    }

    #[test]
    fn edit_request_accepts_full_text_only() {
        let raw = r#"{"type":"text:edit","roomId":"r1","fullText":"hello"}"#;
        let req: ClientRequest = serde_json::from_str(raw).unwrap();
        match req {
            ClientRequest::EditText(edit) => {
                assert_eq!(edit.full_text.as_deref(), Some("hello"));
                assert!(edit.operation.is_none());
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }
}
