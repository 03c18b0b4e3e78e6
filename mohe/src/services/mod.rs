mod contextual;
mod recommendation;
pub mod scheduler;
mod similarity;
mod top_k;
mod vectors;

pub use contextual::{
    base_score, bounding_box, haversine_km, is_open_at, rank, score_place, time_boost,
    weather_boost, ContextualService, RankingContext,
};
pub use recommendation::{
    area_of, diversify, freshness_factor, popularity_penalty, RecommendationService,
    RecommendationStage, StageFailure, EMPTY_MESSAGE, KEYWORD_MATCH_REASON,
    SIMILAR_TO_BOOKMARK_REASON,
};
pub use scheduler::{
    DirtyPlaces, FlagGuard, FullRecalculationManager, RecalculationFlag, RecalculationOutcome,
    SimilarityCleanupManager, SimilarityScheduler, TopKRefreshManager,
    VectorSimilarityBatchManager,
};
pub use similarity::{pair_decay, pair_similarity, SimilarityService};
pub use top_k::{rank_neighbors, TopKService};
pub use vectors::{
    compute_similarity, cosine_similarity, euclidean_distance, jaccard_similarity,
    matching_keywords, recommendation_reason, VectorService, DEFAULT_MIN_SIMILARITY,
};
