use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::TopKEntry;

pub struct TopKRepository;

impl TopKRepository {
    /// Swap a place's neighbor list in one transaction. Readers see the old or the new list.
    pub async fn replace(conn: &Connection, place_id: i64, entries: &[TopKEntry]) -> Result<u64> {
        let tx = conn.transaction().await?;

        tx.execute(
            "DELETE FROM place_similarity_topk WHERE place_id = ?1",
            params![place_id],
        )
        .await?;

        for entry in entries {
            tx.execute(
                r#"
                INSERT INTO place_similarity_topk (
                    place_id, neighbor_place_id, rank, jaccard, cosine, co_users, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    place_id,
                    entry.neighbor_place_id,
                    entry.rank,
                    entry.jaccard,
                    entry.cosine,
                    entry.co_users,
                    entry.updated_at.to_rfc3339(),
                ],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(entries.len() as u64)
    }

    pub async fn list_for_place(
        conn: &Connection,
        place_id: i64,
        limit: usize,
    ) -> Result<Vec<TopKEntry>> {
        let mut rows = conn
            .query(
                r#"
                SELECT place_id, neighbor_place_id, rank, jaccard, cosine, co_users, updated_at
                FROM place_similarity_topk
                WHERE place_id = ?1
                ORDER BY rank ASC
                LIMIT ?2
                "#,
                params![place_id, limit as i64],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_entry(&row)?);
        }
        Ok(results)
    }

    pub async fn count(conn: &Connection) -> Result<i64> {
        let mut rows = conn
            .query("SELECT COUNT(*) FROM place_similarity_topk", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    pub async fn place_ids(conn: &Connection) -> Result<Vec<i64>> {
        let mut rows = conn
            .query(
                "SELECT DISTINCT place_id FROM place_similarity_topk ORDER BY place_id ASC",
                (),
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<i64>(0)?);
        }
        Ok(ids)
    }

    fn row_to_entry(row: &libsql::Row) -> Result<TopKEntry> {
        Ok(TopKEntry {
            place_id: row.get(0)?,
            neighbor_place_id: row.get(1)?,
            rank: row.get(2)?,
            jaccard: row.get(3)?,
            cosine: row.get(4)?,
            co_users: row.get(5)?,
            updated_at: DateTime::parse_from_rfc3339(&row.get::<String>(6)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
