use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VectorOwner {
    User,
    Place,
}

impl std::fmt::Display for VectorOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Place => write!(f, "place"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    Llm,
    #[default]
    RuleBasedFallback,
}

impl std::fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Llm => write!(f, "llm"),
            Self::RuleBasedFallback => write!(f, "rule_based_fallback"),
        }
    }
}

impl std::str::FromStr for ExtractionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "llm" => Ok(Self::Llm),
            "rule_based_fallback" => Ok(Self::RuleBasedFallback),
            _ => Err(format!("Unknown extraction source: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectedKeyword {
    pub keyword_id: u32,
    pub keyword: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// A keyword vector for a user or a place.
///
/// `vector` has one position per catalog keyword and is non-zero only at
/// the positions of `selected_keywords`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreferenceVector {
    pub owner: VectorOwner,
    pub owner_id: i64,
    pub vector: Vec<f64>,
    pub selected_keywords: Vec<SelectedKeyword>,
    pub extraction_source: ExtractionSource,
    pub model_name: Option<String>,
    pub prompt_hash: Option<String>,
    pub confidence: f64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl PreferenceVector {
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at < ttl
    }

    pub fn keyword_ids_above(&self, threshold: f64) -> std::collections::BTreeSet<u32> {
        self.selected_keywords
            .iter()
            .filter(|k| k.confidence >= threshold)
            .map(|k| k.keyword_id)
            .collect()
    }
}

/// Cached user/place vector similarity, valid for the vector versions it was computed from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VectorSimilarity {
    pub user_id: i64,
    pub place_id: i64,
    pub cosine: f64,
    pub jaccard: f64,
    pub euclidean: f64,
    pub mbti_boost_factor: f64,
    pub weighted: f64,
    pub common_keywords: i64,
    pub user_vector_version: i64,
    pub place_vector_version: i64,
    pub calculated_at: DateTime<Utc>,
}

impl VectorSimilarity {
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.calculated_at < ttl
    }

    pub fn matches_versions(&self, user: &PreferenceVector, place: &PreferenceVector) -> bool {
        self.user_vector_version == user.version && self.place_vector_version == place.version
    }
}

/// A place ranked by keyword vector similarity for a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimilarPlace {
    pub place_id: i64,
    pub place_name: String,
    pub category: Option<String>,
    pub similarity: VectorSimilarity,
    pub reason: String,
}
