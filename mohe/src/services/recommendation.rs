use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::{RecommendationConfig, SimilarityConfig};
use crate::db::DatabaseBackend;
use crate::error::{MoheError, Result};
use crate::models::{
    round4, Bookmark, CombinedWeights, Place, RecommendationAlgorithm, RecommendationCandidate,
    RecommendationRequest, RecommendationResponse, RecommendedPlace, User,
};

pub const SIMILAR_TO_BOOKMARK_REASON: &str = "Similar to your bookmarked place";
pub const KEYWORD_MATCH_REASON: &str = "Matches your keyword preferences";
pub const EMPTY_MESSAGE: &str = "Unable to recommend places yet";
const MAX_POPULARITY_PENALTY: f64 = 0.3;
const MIN_VECTOR_SIMILARITY: f64 = 0.1;
const HIGH_RATING_REASON_MIN: f64 = 4.5;
const UNKNOWN_GROUP: &str = "기타";
const AREA_PREFIX_CHARS: usize = 10;

static DISTRICT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[가-힣]+[구군]").expect("district regex must compile"));

/// Stages of the recommendation fallback pipeline, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationStage {
    SimilarityBased,
    RatingBased,
    PopularityBased,
    Empty,
}

/// Why a stage produced nothing.
#[derive(Debug)]
pub enum StageFailure {
    NoBookmarks,
    NoCandidates,
    Upstream(MoheError),
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoBookmarks => write!(f, "no bookmarks"),
            Self::NoCandidates => write!(f, "no candidates"),
            Self::Upstream(e) => write!(f, "upstream failure: {e}"),
        }
    }
}

impl From<MoheError> for StageFailure {
    fn from(e: MoheError) -> Self {
        Self::Upstream(e)
    }
}

impl RecommendationStage {
    pub fn algorithm(&self) -> RecommendationAlgorithm {
        match self {
            Self::SimilarityBased => RecommendationAlgorithm::MbtiSimilarityBased,
            Self::RatingBased => RecommendationAlgorithm::RatingBasedFiltered,
            Self::PopularityBased => RecommendationAlgorithm::PopularityBasedFallback,
            Self::Empty => RecommendationAlgorithm::None,
        }
    }

    /// The stage to try after this one failed.
    pub fn next_stage(&self, failure: &StageFailure) -> Self {
        match (self, failure) {
            (Self::SimilarityBased, StageFailure::NoBookmarks)
            | (Self::SimilarityBased, StageFailure::NoCandidates)
            | (Self::SimilarityBased, StageFailure::Upstream(_)) => Self::RatingBased,
            (Self::RatingBased, _) => Self::PopularityBased,
            (Self::PopularityBased, _) | (Self::Empty, _) => Self::Empty,
        }
    }
}

/// Top-K row weight as it ages. Never drops below half.
pub fn freshness_factor(age_days: f64, tau_days: f64) -> f64 {
    if tau_days <= 0.0 {
        return 0.5;
    }
    0.5 + 0.5 * (-age_days.max(0.0) / tau_days).exp()
}

/// Multiplier in [0.7, 1.0] that deprioritises heavily reviewed places.
pub fn popularity_penalty(review_count: i64, weight: f64) -> f64 {
    let reviews = review_count.max(0) as f64;
    let penalty = ((1.0 + reviews / 1000.0).ln() * weight).max(0.0);
    1.0 - penalty.min(MAX_POPULARITY_PENALTY)
}

/// District from a Korean address, else a short location prefix.
pub fn area_of(place: &Place) -> String {
    let Some(location) = place.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) else {
        return UNKNOWN_GROUP.to_string();
    };
    match DISTRICT_RE.find(location) {
        Some(m) => m.as_str().to_string(),
        None => location.chars().take(AREA_PREFIX_CHARS).collect(),
    }
}

/// Pick up to `limit` candidates from a score-ordered list, capping repeats of
/// category and area, then fill remaining slots from the leftovers in order.
pub fn diversify(
    candidates: Vec<RecommendationCandidate>,
    limit: usize,
    max_per_category: usize,
    max_per_area: usize,
) -> Vec<RecommendationCandidate> {
    let mut categories: HashMap<String, usize> = HashMap::new();
    let mut areas: HashMap<String, usize> = HashMap::new();
    let mut selected = Vec::with_capacity(limit);
    let mut leftovers = Vec::new();

    for candidate in candidates {
        if selected.len() >= limit {
            leftovers.push(candidate);
            continue;
        }
        let category = candidate.place.category_or_default().to_string();
        let area = area_of(&candidate.place);
        let category_count = categories.get(&category).copied().unwrap_or(0);
        let area_count = areas.get(&area).copied().unwrap_or(0);

        if category_count < max_per_category && area_count < max_per_area {
            *categories.entry(category).or_insert(0) += 1;
            *areas.entry(area).or_insert(0) += 1;
            selected.push(candidate);
        } else {
            leftovers.push(candidate);
        }
    }

    let missing = limit.saturating_sub(selected.len());
    selected.extend(leftovers.into_iter().take(missing));
    selected
}

fn sort_candidates(candidates: &mut [RecommendationCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.place.id.cmp(&b.place.id))
    });
}

fn matches_category(place: &Place, category: Option<&str>) -> bool {
    match category {
        Some(wanted) => place
            .category
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(wanted)),
        None => true,
    }
}

#[derive(Default)]
struct Accumulated {
    score: f64,
    from_top_k: bool,
    from_vectors: bool,
    sources: Vec<i64>,
}

/// Builds ranked recommendations from Top-K neighbors with explicit fallbacks.
#[derive(Clone)]
pub struct RecommendationService {
    db: Arc<dyn DatabaseBackend>,
    config: RecommendationConfig,
    top_k: usize,
    weights: CombinedWeights,
    vector_ttl: Duration,
}

impl RecommendationService {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        config: RecommendationConfig,
        similarity: &SimilarityConfig,
        vector_similarity_ttl_hours: i64,
    ) -> Self {
        Self {
            db,
            config,
            top_k: similarity.top_k,
            weights: CombinedWeights {
                jaccard: similarity.jaccard_weight,
                cosine: similarity.cosine_weight,
            },
            vector_ttl: Duration::hours(vector_similarity_ttl_hours),
        }
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    /// Ranked recommendations for a user. Only an unknown user is an error.
    pub async fn recommend(&self, request: &RecommendationRequest) -> Result<RecommendationResponse> {
        let now = Utc::now();
        let limit = request.limit.max(1);
        let user = self
            .db
            .get_user(request.user_id)
            .await?
            .ok_or_else(|| MoheError::NotFound(format!("User {} not found", request.user_id)))?;

        let bookmarks = self.db.list_bookmarks(user.id).await;
        let bookmarked: HashSet<i64> = bookmarks
            .as_ref()
            .map(|b| b.iter().map(|b| b.place_id).collect())
            .unwrap_or_default();
        let excluded = if request.exclude_bookmarked {
            bookmarked.clone()
        } else {
            HashSet::new()
        };
        let category = request.category.as_deref();

        let mut stage = RecommendationStage::SimilarityBased;
        let mut outcome = match bookmarks {
            Ok(list) => {
                self.similarity_stage(&user, &list, &excluded, category, limit, now)
                    .await
            }
            Err(e) => Err(StageFailure::Upstream(e)),
        };

        loop {
            match outcome {
                Ok(candidates) if !candidates.is_empty() => {
                    let recommendations = self.present(&user, candidates, &bookmarked).await;
                    info!(
                        user_id = user.id,
                        algorithm = %stage.algorithm(),
                        count = recommendations.len(),
                        "Built recommendations"
                    );
                    return Ok(RecommendationResponse {
                        total_count: recommendations.len(),
                        recommendations,
                        algorithm: stage.algorithm(),
                        user_mbti: user.mbti_code(),
                        based_on_bookmarks: bookmarked.len(),
                        message: None,
                    });
                }
                Ok(_) => stage = stage.next_stage(&StageFailure::NoCandidates),
                Err(failure) => {
                    match &failure {
                        StageFailure::Upstream(e) => {
                            warn!(user_id = user.id, ?stage, error = %e, "Recommendation stage failed upstream")
                        }
                        other => debug!(user_id = user.id, ?stage, failure = %other, "Recommendation stage yielded nothing"),
                    }
                    stage = stage.next_stage(&failure);
                }
            }

            outcome = match stage {
                RecommendationStage::RatingBased => {
                    self.rating_stage(&excluded, category, limit, now).await
                }
                RecommendationStage::PopularityBased => {
                    self.popularity_stage(&excluded, category, limit).await
                }
                RecommendationStage::SimilarityBased | RecommendationStage::Empty => {
                    info!(user_id = user.id, "No recommendations available");
                    return Ok(RecommendationResponse {
                        recommendations: Vec::new(),
                        algorithm: RecommendationAlgorithm::None,
                        total_count: 0,
                        user_mbti: user.mbti_code(),
                        based_on_bookmarks: bookmarked.len(),
                        message: Some(EMPTY_MESSAGE.to_string()),
                    });
                }
            };
        }
    }

    async fn similarity_stage(
        &self,
        user: &User,
        bookmarks: &[Bookmark],
        excluded: &HashSet<i64>,
        category: Option<&str>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> std::result::Result<Vec<RecommendationCandidate>, StageFailure> {
        if bookmarks.is_empty() {
            return Err(StageFailure::NoBookmarks);
        }

        let per_bookmark = (self.top_k / bookmarks.len()).max(1);
        let mut accumulated: HashMap<i64, Accumulated> = HashMap::new();

        for bookmark in bookmarks {
            let neighbors = self.db.get_top_k(bookmark.place_id, per_bookmark).await?;
            for entry in neighbors {
                let age_days = (now - entry.updated_at).num_seconds() as f64 / 86_400.0;
                let contribution = entry.combined(self.weights)
                    * freshness_factor(age_days, self.config.freshness_tau_days);
                let acc = accumulated.entry(entry.neighbor_place_id).or_default();
                acc.score += contribution;
                acc.from_top_k = true;
                if !acc.sources.contains(&bookmark.place_id) {
                    acc.sources.push(bookmark.place_id);
                }
            }
        }

        match self
            .db
            .top_vector_similarities(
                user.id,
                MIN_VECTOR_SIMILARITY,
                now - self.vector_ttl,
                self.top_k,
            )
            .await
        {
            Ok(similarities) => {
                for similarity in similarities {
                    let acc = accumulated.entry(similarity.place_id).or_default();
                    acc.score += self.config.vector_blend_weight * similarity.weighted;
                    acc.from_vectors = true;
                }
            }
            Err(e) => warn!(user_id = user.id, error = %e, "Skipping vector similarity blend"),
        }

        if accumulated.is_empty() {
            return Err(StageFailure::NoCandidates);
        }

        let ids: Vec<i64> = accumulated.keys().copied().collect();
        let places = self.db.get_places(&ids).await?;
        let mbti = user.mbti_code();
        let descriptions = match mbti.as_deref() {
            Some(mbti) => match self.db.get_mbti_descriptions(&ids, mbti).await {
                Ok(descriptions) => descriptions,
                Err(e) => {
                    warn!(user_id = user.id, error = %e, "Skipping MBTI boost");
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };

        let mut candidates: Vec<RecommendationCandidate> = places
            .into_iter()
            .filter(|place| place.is_recommendable(now) && matches_category(place, category))
            .filter(|place| !excluded.contains(&place.id))
            .filter_map(|place| {
                let acc = accumulated.remove(&place.id)?;
                let mut candidate = RecommendationCandidate::new(place);
                let mut score = acc.score;
                if acc.from_top_k {
                    candidate.add_reason(SIMILAR_TO_BOOKMARK_REASON);
                }
                if let Some(mbti) = mbti.as_deref() {
                    if descriptions.contains_key(&candidate.place.id) {
                        score *= 1.0 + self.config.mbti_boost;
                        candidate.add_reason(format!("Suits your MBTI ({mbti})"));
                    }
                }
                if acc.from_vectors {
                    candidate.add_reason(KEYWORD_MATCH_REASON);
                }
                if candidate.place.rating >= HIGH_RATING_REASON_MIN {
                    let rating = candidate.place.rating;
                    candidate.add_reason(format!("High-rated place ({rating:.1}/5.0)"));
                }
                score *= popularity_penalty(
                    candidate.place.review_count,
                    self.config.popularity_penalty_weight,
                );
                candidate.score = score;
                candidate.source_place_ids = acc.sources;
                Some(candidate)
            })
            .collect();

        if candidates.is_empty() {
            return Err(StageFailure::NoCandidates);
        }

        sort_candidates(&mut candidates);
        candidates.truncate(limit.saturating_mul(self.config.candidate_multiplier.max(1)));

        let mut selected = if self.config.diversity_enabled {
            diversify(
                candidates,
                limit,
                self.config.max_per_category,
                self.config.max_per_area,
            )
        } else {
            candidates
        };
        selected.truncate(limit);
        Ok(selected)
    }

    async fn rating_stage(
        &self,
        excluded: &HashSet<i64>,
        category: Option<&str>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> std::result::Result<Vec<RecommendationCandidate>, StageFailure> {
        let places = self
            .db
            .top_rated_places(category, limit + excluded.len(), now)
            .await?;

        let candidates: Vec<RecommendationCandidate> = places
            .into_iter()
            .filter(|place| !excluded.contains(&place.id))
            .take(limit)
            .map(|place| {
                let reason = if place.is_recently_opened(now) {
                    "New place worth trying".to_string()
                } else {
                    format!("High-rated place ({:.1}/5.0)", place.rating)
                };
                let mut candidate = RecommendationCandidate::new(place);
                candidate.score = candidate.place.rating / 5.0;
                candidate.add_reason(reason);
                candidate
            })
            .collect();

        if candidates.is_empty() {
            return Err(StageFailure::NoCandidates);
        }
        Ok(candidates)
    }

    async fn popularity_stage(
        &self,
        excluded: &HashSet<i64>,
        category: Option<&str>,
        limit: usize,
    ) -> std::result::Result<Vec<RecommendationCandidate>, StageFailure> {
        let places = self
            .db
            .popular_places(self.config.popular_min_rating, category, limit + excluded.len())
            .await?;

        let candidates: Vec<RecommendationCandidate> = places
            .into_iter()
            .filter(|place| !excluded.contains(&place.id))
            .take(limit)
            .map(|place| {
                let mut candidate = RecommendationCandidate::new(place);
                candidate.score = candidate.place.rating / 5.0;
                candidate.add_reason("High-rated popular place");
                candidate
            })
            .collect();

        if candidates.is_empty() {
            return Err(StageFailure::NoCandidates);
        }
        Ok(candidates)
    }

    async fn present(
        &self,
        user: &User,
        candidates: Vec<RecommendationCandidate>,
        bookmarked: &HashSet<i64>,
    ) -> Vec<RecommendedPlace> {
        let descriptions = match user.mbti_code() {
            Some(mbti) => {
                let ids: Vec<i64> = candidates.iter().map(|c| c.place.id).collect();
                self.db
                    .get_mbti_descriptions(&ids, &mbti)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(user_id = user.id, error = %e, "Failed to load MBTI descriptions");
                        HashMap::new()
                    })
            }
            None => HashMap::new(),
        };

        candidates
            .into_iter()
            .map(|candidate| {
                let place = candidate.place;
                RecommendedPlace {
                    mbti_description: descriptions.get(&place.id).cloned(),
                    is_bookmarked: bookmarked.contains(&place.id),
                    score: round4(candidate.score),
                    reasons: candidate.reasons,
                    id: place.id,
                    name: place.name,
                    category: place.category,
                    location: place.location,
                    latitude: place.latitude,
                    longitude: place.longitude,
                    rating: place.rating,
                    review_count: place.review_count,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VectorConfig;
    use crate::db::testing::temp_backend;
    use crate::models::{PlaceMbtiDescription, TopKEntry};

    fn service(db: Arc<dyn DatabaseBackend>) -> RecommendationService {
        RecommendationService::new(
            db,
            RecommendationConfig::default(),
            &SimilarityConfig::default(),
            VectorConfig::default().similarity_ttl_hours,
        )
    }

    fn place(id: i64, category: &str, location: &str, rating: f64) -> Place {
        let mut place = Place::new(id, format!("Place {id}"));
        place.category = Some(category.to_string());
        place.location = Some(location.to_string());
        place.rating = rating;
        place
    }

    fn candidate(place: Place, score: f64) -> RecommendationCandidate {
        let mut candidate = RecommendationCandidate::new(place);
        candidate.score = score;
        candidate
    }

    fn top_k(place_id: i64, neighbor: i64, rank: i64, jaccard: f64) -> TopKEntry {
        TopKEntry {
            place_id,
            neighbor_place_id: neighbor,
            rank,
            jaccard,
            cosine: jaccard,
            co_users: 3,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_popularity_penalty_is_bounded() {
        assert_eq!(popularity_penalty(0, 0.1), 1.0);
        let moderate = popularity_penalty(1000, 0.1);
        assert!((moderate - (1.0 - 2f64.ln() * 0.1)).abs() < 1e-12);
        for reviews in [10_000, 1_000_000, i64::MAX] {
            let factor = popularity_penalty(reviews, 0.5);
            assert!(factor >= 0.7 - 1e-12, "penalty exceeded cap for {reviews}");
        }
    }

    #[test]
    fn test_freshness_never_below_half() {
        assert_eq!(freshness_factor(0.0, 7.0), 1.0);
        assert!((freshness_factor(7.0, 7.0) - (0.5 + 0.5 / std::f64::consts::E)).abs() < 1e-12);
        assert!(freshness_factor(10_000.0, 7.0) >= 0.5);
    }

    #[test]
    fn test_area_extraction() {
        assert_eq!(area_of(&place(1, "cafe", "서울특별시 마포구 연남동", 4.0)), "마포구");
        assert_eq!(area_of(&place(1, "cafe", "마포구 연남동 123", 4.0)), "마포구");
        assert_eq!(area_of(&place(1, "cafe", "123 Main Street Springfield", 4.0)), "123 Main S");
        let mut unknown = place(1, "cafe", "", 4.0);
        unknown.location = None;
        assert_eq!(area_of(&unknown), "기타");
    }

    #[test]
    fn test_diversity_caps_category_and_area() {
        // Given six cafes in distinct areas and four parks in one district
        let mut candidates = Vec::new();
        for id in 1..=6 {
            candidates.push(candidate(place(id, "cafe", &format!("강남{id}구"), 4.0), 1.0 - id as f64 * 0.01));
        }
        for id in 7..=10 {
            candidates.push(candidate(place(id, "park", "마포구", 4.0), 0.5 - id as f64 * 0.01));
        }

        // When
        let picked = diversify(candidates, 5, 3, 2);

        // Then
        let ids: Vec<i64> = picked.iter().map(|c| c.place.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 7, 8]);
    }

    #[test]
    fn test_diversity_fills_from_leftovers() {
        let candidates: Vec<_> = (1..=5)
            .map(|id| candidate(place(id, "cafe", "마포구", 4.0), 1.0 - id as f64 * 0.1))
            .collect();
        let picked = diversify(candidates, 4, 3, 2);
        let ids: Vec<i64> = picked.iter().map(|c| c.place.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_next_stage_order() {
        let stage = RecommendationStage::SimilarityBased;
        let stage = stage.next_stage(&StageFailure::NoBookmarks);
        assert_eq!(stage, RecommendationStage::RatingBased);
        let stage = stage.next_stage(&StageFailure::NoCandidates);
        assert_eq!(stage, RecommendationStage::PopularityBased);
        let stage = stage.next_stage(&StageFailure::Upstream(MoheError::Internal("x".into())));
        assert_eq!(stage, RecommendationStage::Empty);
    }

    #[tokio::test]
    async fn test_new_user_gets_top_rated_places() {
        // Given twelve places with distinct ratings and a user without bookmarks
        let (db, _tmp) = temp_backend().await;
        for id in 1..=12 {
            db.upsert_place(&place(id, "cafe", "마포구", 3.0 + id as f64 * 0.1))
                .await
                .unwrap();
        }
        let mut low = place(13, "cafe", "마포구", 1.0);
        low.review_count = 5;
        db.upsert_place(&low).await.unwrap();
        db.upsert_user(&User::new(1)).await.unwrap();

        // When
        let response = service(db).recommend(&RecommendationRequest::new(1, 10)).await.unwrap();

        // Then
        let ids: Vec<i64> = response.recommendations.iter().map(|r| r.id).collect();
        assert_eq!(response.algorithm, RecommendationAlgorithm::RatingBasedFiltered);
        assert_eq!(ids, vec![12, 11, 10, 9, 8, 7, 6, 5, 4, 3]);
        assert_eq!(response.recommendations[0].reasons, vec!["High-rated place (4.2/5.0)"]);
    }

    #[tokio::test]
    async fn test_similarity_path_accumulates_and_boosts() {
        // Given a user who bookmarked places 1 and 2, both neighbors of place 3
        let (db, _tmp) = temp_backend().await;
        for id in 1..=4 {
            db.upsert_place(&place(id, "cafe", &format!("{id}동"), 4.0)).await.unwrap();
        }
        db.upsert_user(&User::new(7).with_mbti("ENFP")).await.unwrap();
        db.add_bookmark(&Bookmark::new(7, 1, Some("ENFP".into()))).await.unwrap();
        db.add_bookmark(&Bookmark::new(7, 2, Some("ENFP".into()))).await.unwrap();
        db.replace_top_k(1, &[top_k(1, 3, 1, 0.5), top_k(1, 4, 2, 0.4)]).await.unwrap();
        db.replace_top_k(2, &[top_k(2, 3, 1, 0.5)]).await.unwrap();
        db.upsert_mbti_description(&PlaceMbtiDescription {
            place_id: 4,
            mbti: "ENFP".to_string(),
            description: "lively".to_string(),
        })
        .await
        .unwrap();

        // When
        let response = service(db).recommend(&RecommendationRequest::new(7, 10)).await.unwrap();

        // Then place 3 accumulates two contributions and place 4 gets the MBTI boost
        assert_eq!(response.algorithm, RecommendationAlgorithm::MbtiSimilarityBased);
        let ids: Vec<i64> = response.recommendations.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(response.recommendations[0].score, 1.0);
        assert_eq!(response.recommendations[1].score, 0.52);
        assert_eq!(
            response.recommendations[1].reasons,
            vec![SIMILAR_TO_BOOKMARK_REASON.to_string(), "Suits your MBTI (ENFP)".to_string()]
        );
        assert_eq!(response.recommendations[1].mbti_description.as_deref(), Some("lively"));
        assert_eq!(response.based_on_bookmarks, 2);
    }

    #[tokio::test]
    async fn test_falls_back_when_neighbors_are_all_bookmarked() {
        let (db, _tmp) = temp_backend().await;
        db.upsert_place(&place(1, "cafe", "마포구", 4.0)).await.unwrap();
        db.upsert_place(&place(2, "cafe", "마포구", 4.5)).await.unwrap();
        db.upsert_place(&place(3, "park", "마포구", 3.5)).await.unwrap();
        db.upsert_user(&User::new(7)).await.unwrap();
        db.add_bookmark(&Bookmark::new(7, 1, None)).await.unwrap();
        db.add_bookmark(&Bookmark::new(7, 2, None)).await.unwrap();
        db.replace_top_k(1, &[top_k(1, 2, 1, 0.5)]).await.unwrap();

        let response = service(db).recommend(&RecommendationRequest::new(7, 5)).await.unwrap();

        assert_eq!(response.algorithm, RecommendationAlgorithm::RatingBasedFiltered);
        let ids: Vec<i64> = response.recommendations.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[tokio::test]
    async fn test_empty_catalog_returns_message() {
        let (db, _tmp) = temp_backend().await;
        db.upsert_user(&User::new(1)).await.unwrap();

        let response = service(db).recommend(&RecommendationRequest::new(1, 10)).await.unwrap();

        assert!(response.recommendations.is_empty());
        assert_eq!(response.algorithm, RecommendationAlgorithm::None);
        assert_eq!(response.message.as_deref(), Some(EMPTY_MESSAGE));
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let (db, _tmp) = temp_backend().await;
        let result = service(db).recommend(&RecommendationRequest::new(99, 10)).await;
        assert!(matches!(result, Err(MoheError::NotFound(_))));
    }
}
