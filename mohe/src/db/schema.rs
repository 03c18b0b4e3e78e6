use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Catalog tables, written by the place and user services
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            mbti TEXT,
            age_range TEXT,
            transportation TEXT,
            preferences TEXT
        );

        CREATE TABLE IF NOT EXISTS places (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT,
            description TEXT,
            location TEXT,
            latitude REAL,
            longitude REAL,
            rating REAL NOT NULL DEFAULT 0,
            review_count INTEGER NOT NULL DEFAULT 0,
            opening_hours TEXT,
            tags TEXT DEFAULT '[]',
            amenities TEXT DEFAULT '[]',
            is_new_place INTEGER NOT NULL DEFAULT 0,
            opened_date TEXT,
            first_seen_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_places_rating ON places(rating);
        CREATE INDEX IF NOT EXISTS idx_places_lat_lon ON places(latitude, longitude);

        CREATE TABLE IF NOT EXISTS place_mbti_descriptions (
            place_id INTEGER NOT NULL,
            mbti TEXT NOT NULL,
            description TEXT NOT NULL,
            PRIMARY KEY (place_id, mbti)
        );

        CREATE TABLE IF NOT EXISTS bookmarks (
            user_id INTEGER NOT NULL,
            place_id INTEGER NOT NULL,
            mbti TEXT,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, place_id)
        );

        CREATE INDEX IF NOT EXISTS idx_bookmarks_place_id ON bookmarks(place_id);
        CREATE INDEX IF NOT EXISTS idx_bookmarks_created_at ON bookmarks(created_at);

        -- Latest bookmark removal per place, read by the incremental sweep
        CREATE TABLE IF NOT EXISTS bookmark_removals (
            place_id INTEGER PRIMARY KEY,
            removed_at TEXT NOT NULL
        );

        -- Pairwise place similarity, one row per unordered pair
        CREATE TABLE IF NOT EXISTS place_similarity (
            place_id_low INTEGER NOT NULL,
            place_id_high INTEGER NOT NULL,
            jaccard REAL NOT NULL,
            cosine REAL NOT NULL,
            co_users INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (place_id_low, place_id_high),
            CHECK (place_id_low < place_id_high)
        );

        CREATE INDEX IF NOT EXISTS idx_place_similarity_high ON place_similarity(place_id_high);
        CREATE INDEX IF NOT EXISTS idx_place_similarity_updated_at ON place_similarity(updated_at);

        CREATE TABLE IF NOT EXISTS place_similarity_topk (
            place_id INTEGER NOT NULL,
            neighbor_place_id INTEGER NOT NULL,
            rank INTEGER NOT NULL,
            jaccard REAL NOT NULL,
            cosine REAL NOT NULL,
            co_users INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (place_id, neighbor_place_id)
        );

        CREATE INDEX IF NOT EXISTS idx_topk_place_rank ON place_similarity_topk(place_id, rank);

        -- Keyword vectors
        CREATE TABLE IF NOT EXISTS user_preference_vectors (
            owner_id INTEGER PRIMARY KEY,
            vector TEXT NOT NULL,
            selected_keywords TEXT NOT NULL DEFAULT '[]',
            extraction_source TEXT NOT NULL,
            model_name TEXT,
            prompt_hash TEXT,
            confidence REAL NOT NULL DEFAULT 0,
            version INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS place_description_vectors (
            owner_id INTEGER PRIMARY KEY,
            vector TEXT NOT NULL,
            selected_keywords TEXT NOT NULL DEFAULT '[]',
            extraction_source TEXT NOT NULL,
            model_name TEXT,
            prompt_hash TEXT,
            confidence REAL NOT NULL DEFAULT 0,
            version INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS vector_similarities (
            user_id INTEGER NOT NULL,
            place_id INTEGER NOT NULL,
            cosine REAL NOT NULL,
            jaccard REAL NOT NULL,
            euclidean REAL NOT NULL,
            mbti_boost_factor REAL NOT NULL,
            weighted REAL NOT NULL,
            common_keywords INTEGER NOT NULL,
            user_vector_version INTEGER NOT NULL,
            place_vector_version INTEGER NOT NULL,
            calculated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, place_id)
        );

        CREATE INDEX IF NOT EXISTS idx_vector_similarities_place ON vector_similarities(place_id);
        CREATE INDEX IF NOT EXISTS idx_vector_similarities_weighted ON vector_similarities(user_id, weighted);
        "#,
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let conn = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap()
            .connect()
            .unwrap();

        init_schema(&conn).await.unwrap();
        init_schema(&conn).await.unwrap();

        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name LIKE 'place%'",
                (),
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        let count: i64 = row.get(0).unwrap();
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn test_pair_order_is_enforced() {
        let conn = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap()
            .connect()
            .unwrap();
        init_schema(&conn).await.unwrap();

        let result = conn
            .execute(
                "INSERT INTO place_similarity VALUES (5, 2, 0.1, 0.1, 1, '2024-01-01T00:00:00Z')",
                (),
            )
            .await;
        assert!(result.is_err());
    }
}
