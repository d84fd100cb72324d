use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Query parameters for a forced room deletion
#[derive(Debug, Deserialize, ToSchema)]
pub struct RoomDeleteParams {
    /// Human-readable reason forwarded to connected members in the
    /// terminal `room:deleted` event
    pub reason: Option<String>,
}

/// Response for a forced room deletion
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RoomDeleteResponse {
    pub success: bool,
}
