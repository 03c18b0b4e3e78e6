use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Place;

/// Which stage of the fallback pipeline produced a recommendation list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationAlgorithm {
    MbtiSimilarityBased,
    RatingBasedFiltered,
    PopularityBasedFallback,
    None,
}

impl std::fmt::Display for RecommendationAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MbtiSimilarityBased => write!(f, "mbti_similarity_based"),
            Self::RatingBasedFiltered => write!(f, "rating_based_filtered"),
            Self::PopularityBasedFallback => write!(f, "popularity_based_fallback"),
            Self::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRequest {
    pub user_id: i64,
    pub limit: usize,
    pub exclude_bookmarked: bool,
    pub category: Option<String>,
}

impl RecommendationRequest {
    pub fn new(user_id: i64, limit: usize) -> Self {
        Self {
            user_id,
            limit,
            exclude_bookmarked: true,
            category: None,
        }
    }
}

/// A place being scored during one orchestration pass. Never persisted.
#[derive(Debug, Clone)]
pub struct RecommendationCandidate {
    pub place: Place,
    pub score: f64,
    pub reasons: Vec<String>,
    pub source_place_ids: Vec<i64>,
}

impl RecommendationCandidate {
    pub fn new(place: Place) -> Self {
        Self {
            place,
            score: 0.0,
            reasons: Vec::new(),
            source_place_ids: Vec::new(),
        }
    }

    pub fn add_reason(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        if !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedPlace {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: f64,
    pub review_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mbti_description: Option<String>,
    pub is_bookmarked: bool,
    pub score: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub recommendations: Vec<RecommendedPlace>,
    pub algorithm: RecommendationAlgorithm,
    pub total_count: usize,
    pub user_mbti: Option<String>,
    pub based_on_bookmarks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
