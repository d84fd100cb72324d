use crate::{
    handlers::{cleanup_tick, health_check, ready_check, room_delete},
    ws::handler::websocket_handler,
    AppState,
};
use axum::{
    routing::{delete, get, post},
    Router,
};

/// Create API routes
pub fn create_api_routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(health_check))
        .route("/v1/ready", get(ready_check))
        .route("/v1/rooms/:room_id", delete(room_delete))
        .route("/v1/cleanup", post(cleanup_tick))
        .route("/socket", get(websocket_handler))
        .with_state(state)
}
