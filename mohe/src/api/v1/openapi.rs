use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mohe API",
        version = "1.0.0",
        description = "Place recommendation and similarity engine.",
    ),
    paths(
        handlers::health::health_check,
        handlers::recommendations::get_recommendations,
        handlers::contextual::contextual_recommendations,
        handlers::vectors::user_place_similarity,
        handlers::vectors::similar_places,
        handlers::similarities::calculate_pair,
        handlers::similarities::refresh_top_k,
        handlers::similarities::statistics,
        handlers::admin::trigger_recalculation,
        handlers::admin::recalculation_status,
        handlers::admin::mark_dirty,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        response::ResponseMeta,
        // Recommendations
        dto::recommendations::RecommendationsQuery,
        dto::recommendations::UserPlaceSimilarityQuery,
        dto::recommendations::SimilarPlacesQuery,
        models::RecommendationAlgorithm,
        models::RecommendedPlace,
        models::RecommendationResponse,
        // Contextual
        models::ContextualRequest,
        models::ContextualResponse,
        models::ContextualPlace,
        models::SearchContext,
        models::Daypart,
        models::WeatherSnapshot,
        models::WeatherCondition,
        // Vectors
        models::VectorSimilarity,
        models::SimilarPlace,
        // Similarities
        dto::similarities::CalculatePairRequest,
        dto::similarities::CalculatePairResponse,
        dto::similarities::RefreshTopKRequest,
        models::PairwiseSimilarity,
        models::SimilarityStatistics,
        models::TopKRefreshReport,
        // Admin
        dto::admin::RecalculationTriggerResponse,
        dto::admin::RecalculationStatusResponse,
        dto::admin::MarkDirtyRequest,
        dto::admin::MarkDirtyResponse,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
        handlers::health::LlmStatus,
        handlers::health::WeatherStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "recommendations", description = "Bookmark-based and contextual recommendations"),
        (name = "vectors", description = "Keyword vector similarity between users and places"),
        (name = "similarities", description = "Place-pair similarity and Top-K neighbor cache"),
        (name = "admin", description = "Recalculation control"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
