use crate::{models::CleanupResponse, AppState};
use axum::{extract::State, Json};
use tracing::info;

/// Run one cleanup sweep pass on demand, outside the timer schedule.
pub async fn cleanup_tick(State(state): State<AppState>) -> Json<CleanupResponse> {
    let reclaimed = state.cleanup.cleanup_tick().await;
    info!("On-demand cleanup pass reclaimed {} rooms", reclaimed);
    Json(CleanupResponse { reclaimed })
}
