use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::VectorSimilarity;

const COLUMNS: &str = "user_id, place_id, cosine, jaccard, euclidean, mbti_boost_factor, weighted, \
    common_keywords, user_vector_version, place_vector_version, calculated_at";

pub struct VectorSimilarityRepository;

impl VectorSimilarityRepository {
    pub async fn get(
        conn: &Connection,
        user_id: i64,
        place_id: i64,
    ) -> Result<Option<VectorSimilarity>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM vector_similarities WHERE user_id = ?1 AND place_id = ?2"
        );
        let mut rows = conn.query(&sql, params![user_id, place_id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_similarity(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn upsert(conn: &Connection, similarity: &VectorSimilarity) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO vector_similarities (
                user_id, place_id, cosine, jaccard, euclidean, mbti_boost_factor, weighted,
                common_keywords, user_vector_version, place_vector_version, calculated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(user_id, place_id) DO UPDATE SET
                cosine = excluded.cosine,
                jaccard = excluded.jaccard,
                euclidean = excluded.euclidean,
                mbti_boost_factor = excluded.mbti_boost_factor,
                weighted = excluded.weighted,
                common_keywords = excluded.common_keywords,
                user_vector_version = excluded.user_vector_version,
                place_vector_version = excluded.place_vector_version,
                calculated_at = excluded.calculated_at
            "#,
            params![
                similarity.user_id,
                similarity.place_id,
                similarity.cosine,
                similarity.jaccard,
                similarity.euclidean,
                similarity.mbti_boost_factor,
                similarity.weighted,
                similarity.common_keywords,
                similarity.user_vector_version,
                similarity.place_vector_version,
                similarity.calculated_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn delete_for_user(conn: &Connection, user_id: i64) -> Result<u64> {
        let affected = conn
            .execute(
                "DELETE FROM vector_similarities WHERE user_id = ?1",
                params![user_id],
            )
            .await?;
        Ok(affected)
    }

    pub async fn delete_for_place(conn: &Connection, place_id: i64) -> Result<u64> {
        let affected = conn
            .execute(
                "DELETE FROM vector_similarities WHERE place_id = ?1",
                params![place_id],
            )
            .await?;
        Ok(affected)
    }

    /// A user's rows computed after `since` with `weighted >= min_weighted`, best first.
    pub async fn top_for_user(
        conn: &Connection,
        user_id: i64,
        min_weighted: f64,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<VectorSimilarity>> {
        let sql = format!(
            r#"
            SELECT {COLUMNS} FROM vector_similarities
            WHERE user_id = ?1 AND weighted >= ?2 AND calculated_at >= ?3
            ORDER BY weighted DESC, place_id ASC
            LIMIT ?4
            "#
        );
        let mut rows = conn
            .query(
                &sql,
                params![user_id, min_weighted, since.to_rfc3339(), limit as i64],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_similarity(&row)?);
        }
        Ok(results)
    }

    pub async fn delete_calculated_before(conn: &Connection, before: DateTime<Utc>) -> Result<u64> {
        let affected = conn
            .execute(
                "DELETE FROM vector_similarities WHERE calculated_at < ?1",
                params![before.to_rfc3339()],
            )
            .await?;
        Ok(affected)
    }

    fn row_to_similarity(row: &libsql::Row) -> Result<VectorSimilarity> {
        Ok(VectorSimilarity {
            user_id: row.get(0)?,
            place_id: row.get(1)?,
            cosine: row.get(2)?,
            jaccard: row.get(3)?,
            euclidean: row.get(4)?,
            mbti_boost_factor: row.get(5)?,
            weighted: row.get(6)?,
            common_keywords: row.get(7)?,
            user_vector_version: row.get(8)?,
            place_vector_version: row.get(9)?,
            calculated_at: DateTime::parse_from_rfc3339(&row.get::<String>(10)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
