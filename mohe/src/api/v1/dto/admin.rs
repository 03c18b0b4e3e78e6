//! Admin DTOs for the v1 API.

use serde::{Deserialize, Serialize};

/// Response for `POST /api/v1/admin/similarities:recalculate`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecalculationTriggerResponse {
    /// False when a full pass was already running.
    pub started: bool,
    pub status: String,
}

/// Response for `GET /api/v1/admin/similarities/status`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecalculationStatusResponse {
    pub running: bool,
    pub dirty_places: usize,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkDirtyRequest {
    pub place_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkDirtyResponse {
    pub marked: usize,
    /// Dirty places waiting for the next incremental refresh.
    pub pending: usize,
}
