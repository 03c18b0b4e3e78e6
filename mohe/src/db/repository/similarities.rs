use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{canonical_pair, PairwiseSimilarity};

const SIMILARITY_COLUMNS: &str = "place_id_low, place_id_high, jaccard, cosine, co_users, updated_at";

pub struct SimilarityRepository;

impl SimilarityRepository {
    /// Replace the row for the pair. Works on a plain connection or a transaction.
    pub async fn upsert(conn: &Connection, similarity: &PairwiseSimilarity) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO place_similarity (
                place_id_low, place_id_high, jaccard, cosine, co_users, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(place_id_low, place_id_high) DO UPDATE SET
                jaccard = excluded.jaccard,
                cosine = excluded.cosine,
                co_users = excluded.co_users,
                updated_at = excluded.updated_at
            "#,
            params![
                similarity.place_id_low,
                similarity.place_id_high,
                similarity.jaccard,
                similarity.cosine,
                similarity.co_users,
                similarity.updated_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    /// Upsert a batch inside one transaction.
    pub async fn upsert_batch(conn: &Connection, batch: &[PairwiseSimilarity]) -> Result<u64> {
        if batch.is_empty() {
            return Ok(0);
        }

        let tx = conn.transaction().await?;
        for similarity in batch {
            Self::upsert(&tx, similarity).await?;
        }
        tx.commit().await?;

        Ok(batch.len() as u64)
    }

    pub async fn get(conn: &Connection, a: i64, b: i64) -> Result<Option<PairwiseSimilarity>> {
        let (low, high) = canonical_pair(a, b);
        let sql = format!(
            "SELECT {SIMILARITY_COLUMNS} FROM place_similarity \
             WHERE place_id_low = ?1 AND place_id_high = ?2"
        );
        let mut rows = conn.query(&sql, params![low, high]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_similarity(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn delete_pair(conn: &Connection, a: i64, b: i64) -> Result<bool> {
        let (low, high) = canonical_pair(a, b);
        let affected = conn
            .execute(
                "DELETE FROM place_similarity WHERE place_id_low = ?1 AND place_id_high = ?2",
                params![low, high],
            )
            .await?;
        Ok(affected > 0)
    }

    /// Every pair involving `place_id`, in either position.
    pub async fn list_for_place(conn: &Connection, place_id: i64) -> Result<Vec<PairwiseSimilarity>> {
        let sql = format!(
            "SELECT {SIMILARITY_COLUMNS} FROM place_similarity \
             WHERE place_id_low = ?1 OR place_id_high = ?1"
        );
        let mut rows = conn.query(&sql, params![place_id]).await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_similarity(&row)?);
        }
        Ok(results)
    }

    pub async fn delete_updated_before(conn: &Connection, before: DateTime<Utc>) -> Result<u64> {
        let affected = conn
            .execute(
                "DELETE FROM place_similarity WHERE updated_at < ?1",
                params![before.to_rfc3339()],
            )
            .await?;
        Ok(affected)
    }

    pub async fn count(conn: &Connection) -> Result<i64> {
        let mut rows = conn.query("SELECT COUNT(*) FROM place_similarity", ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    pub async fn sample_recent(conn: &Connection, limit: usize) -> Result<Vec<PairwiseSimilarity>> {
        let sql = format!(
            "SELECT {SIMILARITY_COLUMNS} FROM place_similarity \
             ORDER BY updated_at DESC, place_id_low ASC, place_id_high ASC LIMIT ?1"
        );
        let mut rows = conn.query(&sql, params![limit as i64]).await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_similarity(&row)?);
        }
        Ok(results)
    }

    /// Every place appearing on either side of a stored pair.
    pub async fn place_ids(conn: &Connection) -> Result<Vec<i64>> {
        let mut rows = conn
            .query(
                r#"
                SELECT place_id_low AS id FROM place_similarity
                UNION
                SELECT place_id_high AS id FROM place_similarity
                ORDER BY id ASC
                "#,
                (),
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<i64>(0)?);
        }
        Ok(ids)
    }

    fn row_to_similarity(row: &libsql::Row) -> Result<PairwiseSimilarity> {
        Ok(PairwiseSimilarity {
            place_id_low: row.get(0)?,
            place_id_high: row.get(1)?,
            jaccard: row.get(2)?,
            cosine: row.get(3)?,
            co_users: row.get(4)?,
            updated_at: DateTime::parse_from_rfc3339(&row.get::<String>(5)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
