use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::connection::Database;
use crate::db::repository::{
    BookmarkRepository, GeoBounds, MbtiWeights, PlaceRepository, SimilarityRepository,
    TopKRepository, UserRepository, VectorRepository, VectorSimilarityRepository,
};
use crate::db::traits::{
    BookmarkStore, DatabaseBackend, PlaceStore, SimilarityStore, TopKStore, UserStore,
    VectorSimilarityStore, VectorStore,
};
use crate::error::Result;
use crate::models::{
    Bookmark, CoOccurrence, PairwiseSimilarity, Place, PlaceMbtiDescription, PreferenceVector,
    TopKEntry, User, VectorOwner, VectorSimilarity,
};

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for LibSqlBackend {
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.db.connect().await?;
        UserRepository::get_by_id(&conn, id).await
    }
    async fn upsert_user(&self, user: &User) -> Result<()> {
        let conn = self.db.connect().await?;
        UserRepository::upsert(&conn, user).await
    }
    async fn list_active_user_ids(&self) -> Result<Vec<i64>> {
        let conn = self.db.connect().await?;
        UserRepository::list_active_ids(&conn).await
    }
}

#[async_trait]
impl PlaceStore for LibSqlBackend {
    async fn get_place(&self, id: i64) -> Result<Option<Place>> {
        let conn = self.db.connect().await?;
        PlaceRepository::get_by_id(&conn, id).await
    }
    async fn get_places(&self, ids: &[i64]) -> Result<Vec<Place>> {
        let conn = self.db.connect().await?;
        PlaceRepository::get_by_ids(&conn, ids).await
    }
    async fn upsert_place(&self, place: &Place) -> Result<()> {
        let conn = self.db.connect().await?;
        PlaceRepository::upsert(&conn, place).await
    }
    async fn top_rated_places(
        &self,
        category: Option<&str>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Place>> {
        let conn = self.db.connect().await?;
        PlaceRepository::top_rated(&conn, category, limit, now).await
    }
    async fn popular_places(
        &self,
        min_rating: f64,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Place>> {
        let conn = self.db.connect().await?;
        PlaceRepository::popular(&conn, min_rating, category, limit).await
    }
    async fn places_within(&self, bounds: GeoBounds) -> Result<Vec<Place>> {
        let conn = self.db.connect().await?;
        PlaceRepository::within_bounds(&conn, bounds).await
    }
    async fn list_place_ids(&self) -> Result<Vec<i64>> {
        let conn = self.db.connect().await?;
        PlaceRepository::list_ids(&conn).await
    }
    async fn get_mbti_description(&self, place_id: i64, mbti: &str) -> Result<Option<String>> {
        let conn = self.db.connect().await?;
        PlaceRepository::get_mbti_description(&conn, place_id, mbti).await
    }
    async fn get_mbti_descriptions(
        &self,
        place_ids: &[i64],
        mbti: &str,
    ) -> Result<HashMap<i64, String>> {
        let conn = self.db.connect().await?;
        PlaceRepository::get_mbti_descriptions(&conn, place_ids, mbti).await
    }
    async fn upsert_mbti_description(&self, description: &PlaceMbtiDescription) -> Result<()> {
        let conn = self.db.connect().await?;
        PlaceRepository::upsert_mbti_description(&conn, description).await
    }
}

#[async_trait]
impl BookmarkStore for LibSqlBackend {
    async fn add_bookmark(&self, bookmark: &Bookmark) -> Result<()> {
        let conn = self.db.connect().await?;
        BookmarkRepository::add(&conn, bookmark).await
    }
    async fn remove_bookmark(&self, user_id: i64, place_id: i64) -> Result<bool> {
        let conn = self.db.connect().await?;
        BookmarkRepository::remove(&conn, user_id, place_id).await
    }
    async fn list_bookmarks(&self, user_id: i64) -> Result<Vec<Bookmark>> {
        let conn = self.db.connect().await?;
        BookmarkRepository::list_by_user(&conn, user_id).await
    }
    async fn co_occurrence_page(
        &self,
        weights: MbtiWeights,
        after: (i64, i64),
        limit: usize,
    ) -> Result<Vec<CoOccurrence>> {
        let conn = self.db.connect().await?;
        BookmarkRepository::co_occurrence_page(&conn, weights, after, limit).await
    }
    async fn co_occurrence_for_pair(
        &self,
        weights: MbtiWeights,
        a: i64,
        b: i64,
    ) -> Result<Option<CoOccurrence>> {
        let conn = self.db.connect().await?;
        BookmarkRepository::co_occurrence_for_pair(&conn, weights, a, b).await
    }
    async fn co_occurrences_for_place(
        &self,
        weights: MbtiWeights,
        place_id: i64,
    ) -> Result<Vec<CoOccurrence>> {
        let conn = self.db.connect().await?;
        BookmarkRepository::co_occurrences_for_place(&conn, weights, place_id).await
    }
    async fn bookmark_user_counts(&self, place_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        let conn = self.db.connect().await?;
        BookmarkRepository::user_counts(&conn, place_ids).await
    }
    async fn places_changed_since(&self, since: DateTime<Utc>) -> Result<Vec<i64>> {
        let conn = self.db.connect().await?;
        BookmarkRepository::places_changed_since(&conn, since).await
    }
    async fn bookmarked_categories(&self, user_id: i64) -> Result<Vec<String>> {
        let conn = self.db.connect().await?;
        BookmarkRepository::bookmarked_categories(&conn, user_id).await
    }
}

#[async_trait]
impl SimilarityStore for LibSqlBackend {
    async fn upsert_similarity(&self, similarity: &PairwiseSimilarity) -> Result<()> {
        let conn = self.db.connect().await?;
        SimilarityRepository::upsert(&conn, similarity).await
    }
    async fn write_similarity_batch(&self, batch: &[PairwiseSimilarity]) -> Result<u64> {
        let conn = self.db.connect().await?;
        SimilarityRepository::upsert_batch(&conn, batch).await
    }
    async fn get_similarity(&self, a: i64, b: i64) -> Result<Option<PairwiseSimilarity>> {
        let conn = self.db.connect().await?;
        SimilarityRepository::get(&conn, a, b).await
    }
    async fn delete_similarity(&self, a: i64, b: i64) -> Result<bool> {
        let conn = self.db.connect().await?;
        SimilarityRepository::delete_pair(&conn, a, b).await
    }
    async fn similarities_for_place(&self, place_id: i64) -> Result<Vec<PairwiseSimilarity>> {
        let conn = self.db.connect().await?;
        SimilarityRepository::list_for_place(&conn, place_id).await
    }
    async fn delete_similarities_updated_before(&self, before: DateTime<Utc>) -> Result<u64> {
        let conn = self.db.connect().await?;
        SimilarityRepository::delete_updated_before(&conn, before).await
    }
    async fn count_similarities(&self) -> Result<i64> {
        let conn = self.db.connect().await?;
        SimilarityRepository::count(&conn).await
    }
    async fn sample_recent_similarities(&self, limit: usize) -> Result<Vec<PairwiseSimilarity>> {
        let conn = self.db.connect().await?;
        SimilarityRepository::sample_recent(&conn, limit).await
    }
    async fn places_with_similarities(&self) -> Result<Vec<i64>> {
        let conn = self.db.connect().await?;
        SimilarityRepository::place_ids(&conn).await
    }
}

#[async_trait]
impl TopKStore for LibSqlBackend {
    async fn replace_top_k(&self, place_id: i64, entries: &[TopKEntry]) -> Result<u64> {
        let conn = self.db.connect().await?;
        TopKRepository::replace(&conn, place_id, entries).await
    }
    async fn get_top_k(&self, place_id: i64, limit: usize) -> Result<Vec<TopKEntry>> {
        let conn = self.db.connect().await?;
        TopKRepository::list_for_place(&conn, place_id, limit).await
    }
    async fn count_top_k(&self) -> Result<i64> {
        let conn = self.db.connect().await?;
        TopKRepository::count(&conn).await
    }
    async fn places_with_top_k(&self) -> Result<Vec<i64>> {
        let conn = self.db.connect().await?;
        TopKRepository::place_ids(&conn).await
    }
}

#[async_trait]
impl VectorStore for LibSqlBackend {
    async fn get_vector(
        &self,
        owner: VectorOwner,
        owner_id: i64,
    ) -> Result<Option<PreferenceVector>> {
        let conn = self.db.connect().await?;
        VectorRepository::get(&conn, owner, owner_id).await
    }
    async fn save_vector(&self, vector: &PreferenceVector) -> Result<()> {
        let conn = self.db.connect().await?;
        let tx = conn.transaction().await?;
        VectorRepository::upsert(&tx, vector).await?;
        let invalidated = match vector.owner {
            VectorOwner::User => VectorSimilarityRepository::delete_for_user(&tx, vector.owner_id).await?,
            VectorOwner::Place => {
                VectorSimilarityRepository::delete_for_place(&tx, vector.owner_id).await?
            }
        };
        tx.commit().await?;

        tracing::debug!(
            owner = %vector.owner,
            owner_id = vector.owner_id,
            version = vector.version,
            invalidated,
            "Saved keyword vector"
        );
        Ok(())
    }
    async fn list_vector_owner_ids(&self, owner: VectorOwner) -> Result<Vec<i64>> {
        let conn = self.db.connect().await?;
        VectorRepository::list_owner_ids(&conn, owner).await
    }
}

#[async_trait]
impl VectorSimilarityStore for LibSqlBackend {
    async fn get_vector_similarity(
        &self,
        user_id: i64,
        place_id: i64,
    ) -> Result<Option<VectorSimilarity>> {
        let conn = self.db.connect().await?;
        VectorSimilarityRepository::get(&conn, user_id, place_id).await
    }
    async fn save_vector_similarity(&self, similarity: &VectorSimilarity) -> Result<()> {
        let conn = self.db.connect().await?;
        VectorSimilarityRepository::upsert(&conn, similarity).await
    }
    async fn top_vector_similarities(
        &self,
        user_id: i64,
        min_weighted: f64,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<VectorSimilarity>> {
        let conn = self.db.connect().await?;
        VectorSimilarityRepository::top_for_user(&conn, user_id, min_weighted, since, limit).await
    }
    async fn delete_vector_similarities_before(&self, before: DateTime<Utc>) -> Result<u64> {
        let conn = self.db.connect().await?;
        VectorSimilarityRepository::delete_calculated_before(&conn, before).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }

    async fn ping(&self) -> Result<()> {
        let conn = self.db.connect().await?;
        let mut rows = conn.query("SELECT 1", ()).await?;
        rows.next().await?;
        Ok(())
    }
}
