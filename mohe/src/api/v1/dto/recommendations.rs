use serde::Deserialize;

/// Query for `GET /api/v1/users/{userId}/recommendations`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RecommendationsQuery {
    /// Defaults to the configured recommendation limit. Must be within `1..=100`.
    pub limit: Option<usize>,
    /// Defaults to true.
    pub exclude_bookmarked: Option<bool>,
    pub category: Option<String>,
}

/// Query for `GET /api/v1/users/{userId}/places/{placeId}/similarity`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserPlaceSimilarityQuery {
    /// Defaults to true.
    pub use_cache: Option<bool>,
}

/// Query for `GET /api/v1/users/{userId}/similar-places`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SimilarPlacesQuery {
    /// Defaults to 10. Must be within `1..=100`.
    pub limit: Option<usize>,
    /// Defaults to 0.1.
    pub min_similarity: Option<f64>,
}
