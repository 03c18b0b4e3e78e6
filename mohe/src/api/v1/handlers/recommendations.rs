//! v1 recommendation handlers.

use axum::extract::{Path, State};
use axum_extra::extract::Query;

use crate::api::v1::dto::RecommendationsQuery;
use crate::api::v1::handlers::MAX_LIMIT;
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode, ResponseMeta};
use crate::api::AppState;
use crate::models::{RecommendationRequest, RecommendationResponse};

/// `GET /api/v1/users/{userId}/recommendations`
#[utoipa::path(
    get,
    path = "/api/v1/users/{userId}/recommendations",
    tag = "recommendations",
    operation_id = "recommendations.get",
    params(("userId" = i64, Path, description = "User ID"), RecommendationsQuery),
    responses(
        (status = 200, description = "Ranked recommendations", body = RecommendationResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "User not found", body = ApiError),
    )
)]
pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<RecommendationsQuery>,
) -> ApiResponse<RecommendationResponse> {
    let limit = query
        .limit
        .unwrap_or(state.config.recommendation.default_limit);
    if limit == 0 || limit > MAX_LIMIT {
        return ApiResponse::error(
            ErrorCode::InvalidRequest,
            format!("limit must be between 1 and {MAX_LIMIT}"),
        );
    }

    let request = RecommendationRequest {
        user_id,
        limit,
        exclude_bookmarked: query.exclude_bookmarked.unwrap_or(true),
        category: query.category.filter(|c| !c.trim().is_empty()),
    };

    match state.recommendations.recommend(&request).await {
        Ok(response) => {
            let meta = ResponseMeta {
                total: Some(response.total_count as u64),
                algorithm: Some(response.algorithm.to_string()),
            };
            ApiResponse::success_with_meta(response, meta)
        }
        Err(e) => e.into(),
    }
}
