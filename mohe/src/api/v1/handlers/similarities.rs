//! v1 place-pair similarity and Top-K handlers.

use axum::extract::State;

use crate::api::v1::dto::{CalculatePairRequest, CalculatePairResponse, RefreshTopKRequest};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::models::{SimilarityStatistics, TopKRefreshReport};

/// `POST /api/v1/similarities:calculatePair`
#[utoipa::path(
    post,
    path = "/api/v1/similarities:calculatePair",
    tag = "similarities",
    operation_id = "similarities.calculatePair",
    request_body = CalculatePairRequest,
    responses(
        (status = 200, description = "Pair recalculated, neighbor lists of both places refreshed", body = CalculatePairResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn calculate_pair(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<CalculatePairRequest>,
) -> ApiResponse<CalculatePairResponse> {
    match state
        .similarity
        .calculate_pair(req.place_id_a, req.place_id_b)
        .await
    {
        Ok(similarity) => {
            let report = state
                .top_k
                .refresh_many(&[req.place_id_a, req.place_id_b])
                .await;
            if report.failed > 0 {
                tracing::warn!(
                    place_id_a = req.place_id_a,
                    place_id_b = req.place_id_b,
                    failed = report.failed,
                    "Top-K refresh after pair recalculation failed"
                );
            }
            ApiResponse::success(CalculatePairResponse { similarity })
        }
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/similarities:refreshTopK`
#[utoipa::path(
    post,
    path = "/api/v1/similarities:refreshTopK",
    tag = "similarities",
    operation_id = "similarities.refreshTopK",
    request_body = RefreshTopKRequest,
    responses(
        (status = 200, description = "Neighbor lists refreshed", body = TopKRefreshReport),
        (status = 400, description = "No place ids given", body = ApiError),
    )
)]
pub async fn refresh_top_k(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<RefreshTopKRequest>,
) -> ApiResponse<TopKRefreshReport> {
    let place_ids = req.place_ids();
    if place_ids.is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "placeId or placeIds is required");
    }

    ApiResponse::success(state.top_k.refresh_many(&place_ids).await)
}

/// `GET /api/v1/similarities/statistics`
#[utoipa::path(
    get,
    path = "/api/v1/similarities/statistics",
    tag = "similarities",
    operation_id = "similarities.statistics",
    responses(
        (status = 200, description = "Similarity table statistics", body = SimilarityStatistics),
    )
)]
pub async fn statistics(State(state): State<AppState>) -> ApiResponse<SimilarityStatistics> {
    match state.similarity.statistics().await {
        Ok(stats) => ApiResponse::success(stats),
        Err(e) => e.into(),
    }
}
