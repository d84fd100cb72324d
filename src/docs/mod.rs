use crate::models::*;
use utoipa::OpenApi;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Force-delete a room and evict its connected members
#[utoipa::path(
    delete,
    path = "/api/v1/rooms/{room_id}",
    params(
        ("room_id" = String, Path, description = "Room identifier"),
        ("reason" = Option<String>, Query, description = "Reason forwarded to connected members")
    ),
    responses(
        (status = 200, description = "Room deleted", body = RoomDeleteResponse),
        (status = 500, description = "Deletion failed", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn room_delete_doc() {}

/// Run one cleanup sweep pass on demand
#[utoipa::path(
    post,
    path = "/api/v1/cleanup",
    responses(
        (status = 200, description = "Sweep completed", body = CleanupResponse)
    )
)]
#[allow(dead_code)]
pub async fn cleanup_tick_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        room_delete_doc,
        cleanup_tick_doc,
    ),
    components(
        schemas(HealthResponse, RoomDeleteResponse, CleanupResponse, ErrorResponse)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
