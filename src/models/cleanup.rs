use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for an on-demand cleanup sweep pass
#[derive(Serialize, Deserialize, ToSchema)]
pub struct CleanupResponse {
    /// Rooms fully reclaimed during this pass
    pub reclaimed: usize,
}
