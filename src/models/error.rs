use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Response for an error
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

/// Failures the coordinator reports for room operations.
///
/// Request-scoped variants are sent point-to-point via the `error` event and
/// never broadcast. Oversize *text* is not an error at all; the channel
/// truncates it to the configured ceiling.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room not found")]
    RoomNotFound,
    #[error("Room is inactive or has expired")]
    RoomInactiveOrExpired,
    #[error("Incorrect password")]
    Unauthorized,
    #[error("Not a member of this room")]
    NotAMember,
    #[error("Message exceeds the maximum length")]
    PayloadTooLarge,
    #[error("Too many requests, slow down")]
    RateLimited,
    #[error("Invalid edit: {0}")]
    InvalidOperation(String),
    #[error("Storage unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Room already deleted")]
    AlreadyDeleted,
}

impl RoomError {
    /// Whether a failed join should be answered with a terminal
    /// `room:deleted` event instead of a plain `error`.
    pub fn is_room_gone(&self) -> bool {
        matches!(
            self,
            RoomError::RoomNotFound | RoomError::RoomInactiveOrExpired | RoomError::AlreadyDeleted
        )
    }
}
