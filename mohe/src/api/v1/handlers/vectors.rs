//! v1 keyword vector similarity handlers.

use axum::extract::{Path, State};
use axum_extra::extract::Query;

use crate::api::v1::dto::{SimilarPlacesQuery, UserPlaceSimilarityQuery};
use crate::api::v1::handlers::MAX_LIMIT;
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode, ResponseMeta};
use crate::api::AppState;
use crate::models::{SimilarPlace, VectorSimilarity};
use crate::services::DEFAULT_MIN_SIMILARITY;

/// `GET /api/v1/users/{userId}/places/{placeId}/similarity`
#[utoipa::path(
    get,
    path = "/api/v1/users/{userId}/places/{placeId}/similarity",
    tag = "vectors",
    operation_id = "vectors.userPlaceSimilarity",
    params(
        ("userId" = i64, Path, description = "User ID"),
        ("placeId" = i64, Path, description = "Place ID"),
        UserPlaceSimilarityQuery,
    ),
    responses(
        (status = 200, description = "Vector similarity", body = VectorSimilarity),
        (status = 404, description = "User or place not found", body = ApiError),
    )
)]
pub async fn user_place_similarity(
    State(state): State<AppState>,
    Path((user_id, place_id)): Path<(i64, i64)>,
    Query(query): Query<UserPlaceSimilarityQuery>,
) -> ApiResponse<VectorSimilarity> {
    match state
        .vectors
        .user_place_similarity(user_id, place_id, query.use_cache.unwrap_or(true))
        .await
    {
        Ok(similarity) => ApiResponse::success(similarity),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/users/{userId}/similar-places`
#[utoipa::path(
    get,
    path = "/api/v1/users/{userId}/similar-places",
    tag = "vectors",
    operation_id = "vectors.similarPlaces",
    params(("userId" = i64, Path, description = "User ID"), SimilarPlacesQuery),
    responses(
        (status = 200, description = "Places ranked by vector similarity", body = [SimilarPlace]),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "User not found", body = ApiError),
    )
)]
pub async fn similar_places(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<SimilarPlacesQuery>,
) -> ApiResponse<Vec<SimilarPlace>> {
    let limit = query.limit.unwrap_or(10);
    if limit == 0 || limit > MAX_LIMIT {
        return ApiResponse::error(
            ErrorCode::InvalidRequest,
            format!("limit must be between 1 and {MAX_LIMIT}"),
        );
    }
    let min_similarity = query.min_similarity.unwrap_or(DEFAULT_MIN_SIMILARITY);
    if !min_similarity.is_finite() || min_similarity < 0.0 {
        return ApiResponse::error(ErrorCode::InvalidRequest, "minSimilarity must be >= 0");
    }

    match state
        .vectors
        .top_similar_places_for_user(user_id, limit, min_similarity)
        .await
    {
        Ok(places) => {
            let meta = ResponseMeta {
                total: Some(places.len() as u64),
                algorithm: None,
            };
            ApiResponse::success_with_meta(places, meta)
        }
        Err(e) => e.into(),
    }
}
