//! v1 Admin handlers.

use axum::extract::State;

use crate::api::v1::dto::{
    MarkDirtyRequest, MarkDirtyResponse, RecalculationStatusResponse,
    RecalculationTriggerResponse,
};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;

/// `POST /api/v1/admin/similarities:recalculate`
#[utoipa::path(
    post,
    path = "/api/v1/admin/similarities:recalculate",
    tag = "admin",
    responses(
        (status = 202, description = "Full recalculation started", body = RecalculationTriggerResponse),
        (status = 200, description = "A recalculation is already running", body = RecalculationTriggerResponse),
    )
)]
pub async fn trigger_recalculation(
    State(state): State<AppState>,
) -> ApiResponse<RecalculationTriggerResponse> {
    if state.scheduler.trigger_full_recalculation() {
        ApiResponse::accepted(RecalculationTriggerResponse {
            started: true,
            status: "started".to_string(),
        })
    } else {
        ApiResponse::success(RecalculationTriggerResponse {
            started: false,
            status: "already_running".to_string(),
        })
    }
}

/// `GET /api/v1/admin/similarities/status`
#[utoipa::path(
    get,
    path = "/api/v1/admin/similarities/status",
    tag = "admin",
    responses(
        (status = 200, description = "Recalculation state", body = RecalculationStatusResponse),
    )
)]
pub async fn recalculation_status(
    State(state): State<AppState>,
) -> ApiResponse<RecalculationStatusResponse> {
    ApiResponse::success(RecalculationStatusResponse {
        running: state.scheduler.is_calculation_running(),
        dirty_places: state.scheduler.dirty_count(),
    })
}

/// `POST /api/v1/admin/places:markDirty`
#[utoipa::path(
    post,
    path = "/api/v1/admin/places:markDirty",
    tag = "admin",
    request_body = MarkDirtyRequest,
    responses(
        (status = 200, description = "Places queued for incremental refresh", body = MarkDirtyResponse),
        (status = 400, description = "No place ids given", body = ApiError),
    )
)]
pub async fn mark_dirty(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<MarkDirtyRequest>,
) -> ApiResponse<MarkDirtyResponse> {
    if req.place_ids.is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "placeIds cannot be empty");
    }

    let marked = req.place_ids.len();
    state.scheduler.mark_dirty(req.place_ids);
    ApiResponse::success(MarkDirtyResponse {
        marked,
        pending: state.scheduler.dirty_count(),
    })
}

#[cfg(test)]
mod tests {
    use crate::api::v1::dto::RecalculationTriggerResponse;

    #[test]
    fn trigger_response_serializes_camel_case() {
        let resp = RecalculationTriggerResponse {
            started: false,
            status: "already_running".to_string(),
        };
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["started"], false);
        assert_eq!(json["status"], "already_running");
    }
}
