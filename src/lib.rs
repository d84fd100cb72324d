pub mod auth;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod ws;

use std::sync::Arc;

use services::cleanup_service::CleanupService;
use ws::hub::RoomHub;

/// Shared state handed to every HTTP and websocket handler.
///
/// Constructed once in `main` and injected through axum; nothing in the
/// crate reaches for process-global singletons.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<RoomHub>,
    pub cleanup: Arc<CleanupService>,
}
