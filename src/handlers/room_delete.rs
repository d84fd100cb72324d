use crate::{
    models::{ErrorResponse, RoomDeleteParams, RoomDeleteResponse},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};

/// Force-delete a room, evicting connected members with a terminal
/// `room:deleted` event. Deleting a room that is already gone succeeds.
pub async fn room_delete(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(params): Query<RoomDeleteParams>,
) -> Result<(StatusCode, Json<RoomDeleteResponse>), (StatusCode, Json<ErrorResponse>)> {
    let reason = params.reason.as_deref().unwrap_or("Room deleted");

    match state.cleanup.delete_room(&room_id, reason).await {
        Ok(()) => {
            info!("Room '{}' deleted on request", room_id);
            Ok((StatusCode::OK, Json(RoomDeleteResponse { success: true })))
        }
        Err(e) => {
            error!("Failed to delete room '{}': {}", room_id, e);
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            Err((
                status,
                Json(ErrorResponse {
                    code: status.as_u16(),
                    status: status.to_string(),
                    error: format!("Failed to delete room '{}': {}", room_id, e),
                }),
            ))
        }
    }
}
