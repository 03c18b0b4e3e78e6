use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::repository::{GeoBounds, MbtiWeights};
use crate::error::Result;
use crate::models::{
    Bookmark, CoOccurrence, PairwiseSimilarity, Place, PlaceMbtiDescription, PreferenceVector,
    TopKEntry, User, VectorOwner, VectorSimilarity,
};

// ---------------------------------------------------------------------------
// Catalog stores (owned by other services, read by the engine)
// ---------------------------------------------------------------------------

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    async fn upsert_user(&self, user: &User) -> Result<()>;
    /// Users with at least one bookmark.
    async fn list_active_user_ids(&self) -> Result<Vec<i64>>;
}

#[async_trait]
pub trait PlaceStore: Send + Sync {
    async fn get_place(&self, id: i64) -> Result<Option<Place>>;
    async fn get_places(&self, ids: &[i64]) -> Result<Vec<Place>>;
    async fn upsert_place(&self, place: &Place) -> Result<()>;
    async fn top_rated_places(
        &self,
        category: Option<&str>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Place>>;
    async fn popular_places(
        &self,
        min_rating: f64,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Place>>;
    async fn places_within(&self, bounds: GeoBounds) -> Result<Vec<Place>>;
    async fn list_place_ids(&self) -> Result<Vec<i64>>;
    async fn get_mbti_description(&self, place_id: i64, mbti: &str) -> Result<Option<String>>;
    async fn get_mbti_descriptions(
        &self,
        place_ids: &[i64],
        mbti: &str,
    ) -> Result<HashMap<i64, String>>;
    async fn upsert_mbti_description(&self, description: &PlaceMbtiDescription) -> Result<()>;
}

#[async_trait]
pub trait BookmarkStore: Send + Sync {
    async fn add_bookmark(&self, bookmark: &Bookmark) -> Result<()>;
    async fn remove_bookmark(&self, user_id: i64, place_id: i64) -> Result<bool>;
    async fn list_bookmarks(&self, user_id: i64) -> Result<Vec<Bookmark>>;
    async fn co_occurrence_page(
        &self,
        weights: MbtiWeights,
        after: (i64, i64),
        limit: usize,
    ) -> Result<Vec<CoOccurrence>>;
    async fn co_occurrence_for_pair(
        &self,
        weights: MbtiWeights,
        a: i64,
        b: i64,
    ) -> Result<Option<CoOccurrence>>;
    async fn co_occurrences_for_place(
        &self,
        weights: MbtiWeights,
        place_id: i64,
    ) -> Result<Vec<CoOccurrence>>;
    async fn bookmark_user_counts(&self, place_ids: &[i64]) -> Result<HashMap<i64, i64>>;
    /// Places that gained or lost a bookmark after `since`.
    async fn places_changed_since(&self, since: DateTime<Utc>) -> Result<Vec<i64>>;
    async fn bookmarked_categories(&self, user_id: i64) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// Engine-owned stores
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SimilarityStore: Send + Sync {
    async fn upsert_similarity(&self, similarity: &PairwiseSimilarity) -> Result<()>;
    /// Write a batch in one unit of work, returning the rows written.
    async fn write_similarity_batch(&self, batch: &[PairwiseSimilarity]) -> Result<u64>;
    async fn get_similarity(&self, a: i64, b: i64) -> Result<Option<PairwiseSimilarity>>;
    async fn delete_similarity(&self, a: i64, b: i64) -> Result<bool>;
    async fn similarities_for_place(&self, place_id: i64) -> Result<Vec<PairwiseSimilarity>>;
    async fn delete_similarities_updated_before(&self, before: DateTime<Utc>) -> Result<u64>;
    async fn count_similarities(&self) -> Result<i64>;
    async fn sample_recent_similarities(&self, limit: usize) -> Result<Vec<PairwiseSimilarity>>;
    async fn places_with_similarities(&self) -> Result<Vec<i64>>;
}

#[async_trait]
pub trait TopKStore: Send + Sync {
    /// Atomically replace the neighbor list of `place_id`.
    async fn replace_top_k(&self, place_id: i64, entries: &[TopKEntry]) -> Result<u64>;
    async fn get_top_k(&self, place_id: i64, limit: usize) -> Result<Vec<TopKEntry>>;
    async fn count_top_k(&self) -> Result<i64>;
    /// Places that currently own at least one neighbor row.
    async fn places_with_top_k(&self) -> Result<Vec<i64>>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn get_vector(&self, owner: VectorOwner, owner_id: i64)
        -> Result<Option<PreferenceVector>>;
    /// Persist a regenerated vector and drop every cached similarity involving its owner.
    async fn save_vector(&self, vector: &PreferenceVector) -> Result<()>;
    async fn list_vector_owner_ids(&self, owner: VectorOwner) -> Result<Vec<i64>>;
}

#[async_trait]
pub trait VectorSimilarityStore: Send + Sync {
    async fn get_vector_similarity(
        &self,
        user_id: i64,
        place_id: i64,
    ) -> Result<Option<VectorSimilarity>>;
    async fn save_vector_similarity(&self, similarity: &VectorSimilarity) -> Result<()>;
    async fn top_vector_similarities(
        &self,
        user_id: i64,
        min_weighted: f64,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<VectorSimilarity>>;
    async fn delete_vector_similarities_before(&self, before: DateTime<Utc>) -> Result<u64>;
}

// ---------------------------------------------------------------------------
// Unified backend supertrait
// ---------------------------------------------------------------------------

/// A complete database backend that combines all store traits plus lifecycle
/// operations.
#[async_trait]
pub trait DatabaseBackend:
    UserStore
    + PlaceStore
    + BookmarkStore
    + SimilarityStore
    + TopKStore
    + VectorStore
    + VectorSimilarityStore
{
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;

    /// Cheap round trip used by health checks.
    async fn ping(&self) -> Result<()>;
}
