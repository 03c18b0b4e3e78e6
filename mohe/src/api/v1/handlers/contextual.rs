//! v1 contextual search handler.

use axum::extract::State;

use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode, ResponseMeta};
use crate::api::AppState;
use crate::models::{ContextualRequest, ContextualResponse};

/// `POST /api/v1/recommendations:contextual`
#[utoipa::path(
    post,
    path = "/api/v1/recommendations:contextual",
    tag = "recommendations",
    operation_id = "recommendations.contextual",
    request_body = ContextualRequest,
    responses(
        (status = 200, description = "Places ranked for the current context", body = ContextualResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn contextual_recommendations(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<ContextualRequest>,
) -> ApiResponse<ContextualResponse> {
    if req.query.trim().is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Query cannot be empty");
    }

    match state.contextual.recommend(&req).await {
        Ok(response) => {
            let meta = ResponseMeta {
                total: Some(response.total_results as u64),
                algorithm: None,
            };
            ApiResponse::success_with_meta(response, meta)
        }
        Err(e) => e.into(),
    }
}
