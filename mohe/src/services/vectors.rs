use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::VectorConfig;
use crate::db::DatabaseBackend;
use crate::error::{MoheError, Result};
use crate::keywords::text::{place_description_text, user_profile_text};
use crate::keywords::KeywordExtractor;
use crate::models::{
    round4, Place, PreferenceVector, SimilarPlace, User, VectorOwner, VectorSimilarity,
};

const VECTOR_JACCARD_WEIGHT: f64 = 0.3;
const VECTOR_COSINE_WEIGHT: f64 = 0.7;
/// Default floor for `top_similar_places_for_user`.
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.1;

pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Jaccard index of two keyword sets. Two empty sets are identical.
pub fn jaccard_similarity(a: &BTreeSet<u32>, b: &BTreeSet<u32>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Compare a user vector with a place vector.
pub fn compute_similarity(
    user: &PreferenceVector,
    place: &PreferenceVector,
    has_mbti_description: bool,
    config: &VectorConfig,
    now: DateTime<Utc>,
) -> VectorSimilarity {
    let user_keywords = user.keyword_ids_above(config.jaccard_confidence_threshold);
    let place_keywords = place.keyword_ids_above(config.jaccard_confidence_threshold);

    let cosine = cosine_similarity(&user.vector, &place.vector);
    let jaccard = jaccard_similarity(&user_keywords, &place_keywords);
    let euclidean = euclidean_distance(&user.vector, &place.vector);
    let mbti_boost_factor = if has_mbti_description {
        config.mbti_boost_factor
    } else {
        1.0
    };
    let weighted = ((VECTOR_JACCARD_WEIGHT * jaccard + VECTOR_COSINE_WEIGHT * cosine)
        * mbti_boost_factor)
        .min(config.max_weighted_similarity);

    VectorSimilarity {
        user_id: user.owner_id,
        place_id: place.owner_id,
        cosine: round4(cosine),
        jaccard: round4(jaccard),
        euclidean: round4(euclidean),
        mbti_boost_factor,
        weighted: round4(weighted),
        common_keywords: user_keywords.intersection(&place_keywords).count() as i64,
        user_vector_version: user.version,
        place_vector_version: place.version,
        calculated_at: now,
    }
}

/// Keyword names selected for both vectors, in user order.
pub fn matching_keywords(user: &PreferenceVector, place: &PreferenceVector) -> Vec<String> {
    user.selected_keywords
        .iter()
        .filter(|k| place.selected_keywords.iter().any(|p| p.keyword_id == k.keyword_id))
        .map(|k| k.keyword.clone())
        .collect()
}

pub fn recommendation_reason(
    similarity: &VectorSimilarity,
    matching: &[String],
    mbti: Option<&str>,
) -> String {
    let take = |n: usize, sep: &str| {
        matching
            .iter()
            .take(n)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(sep)
    };

    match (similarity.weighted, mbti) {
        (score, _) if score > 0.8 && matching.len() >= 5 => format!(
            "Perfect match! Shares {} key preferences including {}",
            matching.len(),
            take(3, ", ")
        ),
        (score, Some(mbti)) if score > 0.6 => format!(
            "Great fit for {mbti} personality, matches your preferences for {}",
            take(2, " and ")
        ),
        (score, _) if score > 0.4 => {
            format!("Good match based on your interest in {}", take(2, " and "))
        }
        _ => "Might interest you based on similar preferences".to_string(),
    }
}

/// Keyword vectors for users and places, and their cached similarities.
#[derive(Clone)]
pub struct VectorService {
    db: Arc<dyn DatabaseBackend>,
    extractor: KeywordExtractor,
    config: VectorConfig,
}

impl VectorService {
    pub fn new(db: Arc<dyn DatabaseBackend>, extractor: KeywordExtractor, config: VectorConfig) -> Self {
        Self {
            db,
            extractor,
            config,
        }
    }

    pub fn extractor(&self) -> &KeywordExtractor {
        &self.extractor
    }

    fn ttl(&self, owner: VectorOwner) -> Duration {
        match owner {
            VectorOwner::User => Duration::days(self.config.user_ttl_days),
            VectorOwner::Place => Duration::days(self.config.place_ttl_days),
        }
    }

    /// Return the owner's vector, regenerating it from `text` when missing, stale or forced.
    pub async fn generate_vector(
        &self,
        owner: VectorOwner,
        owner_id: i64,
        text: &str,
        category: Option<&str>,
        mbti: Option<&str>,
        force_regeneration: bool,
    ) -> Result<PreferenceVector> {
        let now = Utc::now();
        let existing = self.db.get_vector(owner, owner_id).await?;

        if let Some(vector) = existing.as_ref() {
            if !force_regeneration && vector.is_fresh(self.ttl(owner), now) {
                return Ok(vector.clone());
            }
        }

        let extraction = self.extractor.extract(text, category, mbti).await;
        let vector = self
            .extractor
            .build_vector(&extraction.selected_keywords)
            .map_err(|e| {
                warn!(%owner, owner_id, error = %e, "Refusing to store invalid vector");
                e
            })?;

        let regenerated = PreferenceVector {
            owner,
            owner_id,
            vector,
            selected_keywords: extraction.selected_keywords,
            extraction_source: extraction.extraction_source,
            model_name: extraction.model_name,
            prompt_hash: Some(extraction.prompt_hash),
            confidence: round4(extraction.confidence),
            version: existing.map(|v| v.version + 1).unwrap_or(1),
            created_at: now,
        };
        self.db.save_vector(&regenerated).await?;

        info!(
            %owner,
            owner_id,
            version = regenerated.version,
            source = %regenerated.extraction_source,
            padded = extraction.padded,
            "Generated keyword vector"
        );
        Ok(regenerated)
    }

    pub async fn generate_user_vector(&self, user_id: i64, force: bool) -> Result<PreferenceVector> {
        let user = self.require_user(user_id).await?;
        self.user_vector(&user, force).await
    }

    pub async fn generate_place_vector(&self, place_id: i64, force: bool) -> Result<PreferenceVector> {
        let place = self.require_place(place_id).await?;
        self.place_vector(&place, force).await
    }

    async fn user_vector(&self, user: &User, force: bool) -> Result<PreferenceVector> {
        let categories = self.db.bookmarked_categories(user.id).await?;
        let text = user_profile_text(user, &categories);
        let mbti = user.mbti_code();
        self.generate_vector(VectorOwner::User, user.id, &text, None, mbti.as_deref(), force)
            .await
    }

    async fn place_vector(&self, place: &Place, force: bool) -> Result<PreferenceVector> {
        let text = place_description_text(place);
        self.generate_vector(
            VectorOwner::Place,
            place.id,
            &text,
            place.category.as_deref(),
            None,
            force,
        )
        .await
    }

    async fn require_user(&self, user_id: i64) -> Result<User> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| MoheError::NotFound(format!("User {user_id} not found")))
    }

    async fn require_place(&self, place_id: i64) -> Result<Place> {
        self.db
            .get_place(place_id)
            .await?
            .ok_or_else(|| MoheError::NotFound(format!("Place {place_id} not found")))
    }

    /// Vector similarity between a user and a place.
    ///
    /// With `use_cache`, a cached row is reused while it is younger than the
    /// similarity TTL and was computed from the current vector versions.
    pub async fn user_place_similarity(
        &self,
        user_id: i64,
        place_id: i64,
        use_cache: bool,
    ) -> Result<VectorSimilarity> {
        let user = self.require_user(user_id).await?;
        let place = self.require_place(place_id).await?;
        let user_vector = self.user_vector(&user, false).await?;
        let place_vector = self.place_vector(&place, false).await?;
        self.similarity_for(&user, &user_vector, &place_vector, use_cache)
            .await
    }

    async fn similarity_for(
        &self,
        user: &User,
        user_vector: &PreferenceVector,
        place_vector: &PreferenceVector,
        use_cache: bool,
    ) -> Result<VectorSimilarity> {
        let now = Utc::now();
        let place_id = place_vector.owner_id;

        if use_cache {
            if let Some(cached) = self.db.get_vector_similarity(user.id, place_id).await? {
                let ttl = Duration::hours(self.config.similarity_ttl_hours);
                if cached.is_fresh(ttl, now) && cached.matches_versions(user_vector, place_vector) {
                    debug!(user_id = user.id, place_id, "Using cached vector similarity");
                    return Ok(cached);
                }
            }
        }

        let has_mbti_description = match user.mbti_code() {
            Some(mbti) => self.db.get_mbti_description(place_id, &mbti).await?.is_some(),
            None => false,
        };

        let similarity = compute_similarity(
            user_vector,
            place_vector,
            has_mbti_description,
            &self.config,
            now,
        );
        self.db.save_vector_similarity(&similarity).await?;
        Ok(similarity)
    }

    /// Places with a stored vector, ranked by weighted similarity for the user.
    pub async fn top_similar_places_for_user(
        &self,
        user_id: i64,
        limit: usize,
        min_similarity: f64,
    ) -> Result<Vec<SimilarPlace>> {
        let user = self.require_user(user_id).await?;
        let user_vector = self.user_vector(&user, false).await?;
        let place_ids = self.db.list_vector_owner_ids(VectorOwner::Place).await?;
        let places = self.db.get_places(&place_ids).await?;
        let mbti = user.mbti_code();

        let mut matches = Vec::new();
        for place in places {
            let result = async {
                let place_vector = self.place_vector(&place, false).await?;
                let similarity = self
                    .similarity_for(&user, &user_vector, &place_vector, true)
                    .await?;
                Ok::<_, MoheError>((place_vector, similarity))
            }
            .await;

            match result {
                Ok((place_vector, similarity)) if similarity.weighted >= min_similarity => {
                    let matching = matching_keywords(&user_vector, &place_vector);
                    let reason = recommendation_reason(&similarity, &matching, mbti.as_deref());
                    matches.push(SimilarPlace {
                        place_id: place.id,
                        place_name: place.name.clone(),
                        category: place.category.clone(),
                        similarity,
                        reason,
                    });
                }
                Ok(_) => {}
                Err(e) => warn!(user_id, place_id = place.id, error = %e, "Failed to score place"),
            }
        }

        matches.sort_by(|a, b| {
            b.similarity
                .weighted
                .total_cmp(&a.similarity.weighted)
                .then(a.place_id.cmp(&b.place_id))
        });
        matches.truncate(limit);
        Ok(matches)
    }

    /// Refresh cached similarities for every active user against every
    /// recommendable place that has a vector. Stops early on cancellation.
    pub async fn batch_calculate_similarities(
        &self,
        batch_size: usize,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let now = Utc::now();
        let batch_size = batch_size.max(1);
        let user_ids = self.db.list_active_user_ids().await?;
        let place_ids = self.db.list_vector_owner_ids(VectorOwner::Place).await?;
        let places: Vec<Place> = self
            .db
            .get_places(&place_ids)
            .await?
            .into_iter()
            .filter(|p| p.is_recommendable(now))
            .collect();

        info!(
            users = user_ids.len(),
            places = places.len(),
            "Starting batch vector similarity calculation"
        );

        let mut processed = 0u64;
        for user_id in user_ids {
            if cancel.is_cancelled() {
                info!(processed, "Batch vector similarity calculation cancelled");
                return Ok(processed);
            }

            let (user, user_vector) = match self.require_user(user_id).await {
                Ok(user) => match self.user_vector(&user, false).await {
                    Ok(vector) => (user, vector),
                    Err(e) => {
                        warn!(user_id, error = %e, "Failed to prepare user vector");
                        continue;
                    }
                },
                Err(e) => {
                    warn!(user_id, error = %e, "Skipping user");
                    continue;
                }
            };

            for chunk in places.chunks(batch_size) {
                if cancel.is_cancelled() {
                    info!(processed, "Batch vector similarity calculation cancelled");
                    return Ok(processed);
                }
                for place in chunk {
                    let result = async {
                        let place_vector = self.place_vector(place, false).await?;
                        self.similarity_for(&user, &user_vector, &place_vector, true)
                            .await
                    }
                    .await;
                    match result {
                        Ok(_) => processed += 1,
                        Err(e) => warn!(user_id, place_id = place.id, error = %e, "Failed to calculate similarity"),
                    }
                }
            }
        }

        info!(processed, "Batch vector similarity calculation complete");
        Ok(processed)
    }

    /// Delete cached similarities calculated more than `older_than_days` ago.
    pub async fn cleanup_old_similarities(&self, older_than_days: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(older_than_days);
        let deleted = self.db.delete_vector_similarities_before(cutoff).await?;
        info!(older_than_days, deleted, "Cleaned up old vector similarities");
        Ok(deleted)
    }
}
