use std::collections::HashMap;

use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use super::places::placeholders;
use crate::error::Result;
use crate::models::{canonical_pair, Bookmark, CoOccurrence};

/// Weights applied per co-bookmarking user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MbtiWeights {
    pub same: f64,
    pub different: f64,
}

// Self-join over bookmarks: one row per (user, low place, high place).
const CO_OCCURRENCE_SELECT: &str = r#"
    SELECT
        b1.place_id,
        b2.place_id,
        COUNT(DISTINCT b1.user_id),
        SUM(CASE WHEN b1.mbti IS NOT NULL AND b1.mbti = b2.mbti THEN ?1 ELSE ?2 END),
        MAX(CASE WHEN b1.created_at > b2.created_at THEN b1.created_at ELSE b2.created_at END)
    FROM bookmarks b1
    JOIN bookmarks b2 ON b1.user_id = b2.user_id AND b1.place_id < b2.place_id
"#;

pub struct BookmarkRepository;

impl BookmarkRepository {
    pub async fn add(conn: &Connection, bookmark: &Bookmark) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO bookmarks (user_id, place_id, mbti, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, place_id) DO NOTHING
            "#,
            params![
                bookmark.user_id,
                bookmark.place_id,
                bookmark.mbti.as_ref().map(|m| m.to_uppercase()),
                bookmark.created_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    /// Delete a bookmark and record the removal for the incremental sweep.
    pub async fn remove(conn: &Connection, user_id: i64, place_id: i64) -> Result<bool> {
        let tx = conn.transaction().await?;
        let affected = tx
            .execute(
                "DELETE FROM bookmarks WHERE user_id = ?1 AND place_id = ?2",
                params![user_id, place_id],
            )
            .await?;

        if affected > 0 {
            tx.execute(
                r#"
                INSERT INTO bookmark_removals (place_id, removed_at) VALUES (?1, ?2)
                ON CONFLICT(place_id) DO UPDATE SET removed_at = excluded.removed_at
                "#,
                params![place_id, Utc::now().to_rfc3339()],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(affected > 0)
    }

    pub async fn list_by_user(conn: &Connection, user_id: i64) -> Result<Vec<Bookmark>> {
        let mut rows = conn
            .query(
                r#"
                SELECT user_id, place_id, mbti, created_at
                FROM bookmarks
                WHERE user_id = ?1
                ORDER BY created_at DESC, place_id ASC
                "#,
                params![user_id],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_bookmark(&row)?);
        }
        Ok(results)
    }

    /// Co-occurrence for pairs after `(after_low, after_high)` in pair order.
    pub async fn co_occurrence_page(
        conn: &Connection,
        weights: MbtiWeights,
        after: (i64, i64),
        limit: usize,
    ) -> Result<Vec<CoOccurrence>> {
        let sql = format!(
            r#"{CO_OCCURRENCE_SELECT}
            WHERE b1.place_id > ?3 OR (b1.place_id = ?3 AND b2.place_id > ?4)
            GROUP BY b1.place_id, b2.place_id
            ORDER BY b1.place_id ASC, b2.place_id ASC
            LIMIT ?5
            "#
        );
        let mut rows = conn
            .query(
                &sql,
                params![weights.same, weights.different, after.0, after.1, limit as i64],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_co_occurrence(&row)?);
        }
        Ok(results)
    }

    pub async fn co_occurrence_for_pair(
        conn: &Connection,
        weights: MbtiWeights,
        a: i64,
        b: i64,
    ) -> Result<Option<CoOccurrence>> {
        let (low, high) = canonical_pair(a, b);
        let sql = format!(
            r#"{CO_OCCURRENCE_SELECT}
            WHERE b1.place_id = ?3 AND b2.place_id = ?4
            GROUP BY b1.place_id, b2.place_id
            "#
        );
        let mut rows = conn
            .query(&sql, params![weights.same, weights.different, low, high])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_co_occurrence(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Co-occurrence for every pair involving `place_id`.
    pub async fn co_occurrences_for_place(
        conn: &Connection,
        weights: MbtiWeights,
        place_id: i64,
    ) -> Result<Vec<CoOccurrence>> {
        let sql = format!(
            r#"{CO_OCCURRENCE_SELECT}
            WHERE b1.place_id = ?3 OR b2.place_id = ?3
            GROUP BY b1.place_id, b2.place_id
            ORDER BY b1.place_id ASC, b2.place_id ASC
            "#
        );
        let mut rows = conn
            .query(&sql, params![weights.same, weights.different, place_id])
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_co_occurrence(&row)?);
        }
        Ok(results)
    }

    /// Distinct bookmarking users per place.
    pub async fn user_counts(conn: &Connection, place_ids: &[i64]) -> Result<HashMap<i64, i64>> {
        if place_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT place_id, COUNT(DISTINCT user_id) FROM bookmarks \
             WHERE place_id IN ({}) GROUP BY place_id",
            placeholders(place_ids.len(), 1)
        );
        let values: Vec<libsql::Value> =
            place_ids.iter().map(|id| libsql::Value::from(*id)).collect();

        let mut rows = conn.query(&sql, libsql::params_from_iter(values)).await?;
        let mut counts = HashMap::new();
        while let Some(row) = rows.next().await? {
            counts.insert(row.get::<i64>(0)?, row.get::<i64>(1)?);
        }
        Ok(counts)
    }

    /// Places that gained or lost a bookmark after `since`.
    pub async fn places_changed_since(
        conn: &Connection,
        since: DateTime<Utc>,
    ) -> Result<Vec<i64>> {
        let mut rows = conn
            .query(
                r#"
                SELECT place_id AS id FROM bookmarks WHERE created_at > ?1
                UNION
                SELECT place_id AS id FROM bookmark_removals WHERE removed_at > ?1
                ORDER BY id ASC
                "#,
                params![since.to_rfc3339()],
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<i64>(0)?);
        }
        Ok(ids)
    }

    /// Categories of the places a user bookmarked, most frequent first.
    pub async fn bookmarked_categories(conn: &Connection, user_id: i64) -> Result<Vec<String>> {
        let mut rows = conn
            .query(
                r#"
                SELECT p.category, COUNT(*) AS n
                FROM bookmarks b
                JOIN places p ON p.id = b.place_id
                WHERE b.user_id = ?1 AND p.category IS NOT NULL
                GROUP BY p.category
                ORDER BY n DESC, p.category ASC
                "#,
                params![user_id],
            )
            .await?;

        let mut categories = Vec::new();
        while let Some(row) = rows.next().await? {
            categories.push(row.get::<String>(0)?);
        }
        Ok(categories)
    }

    fn row_to_bookmark(row: &libsql::Row) -> Result<Bookmark> {
        Ok(Bookmark {
            user_id: row.get(0)?,
            place_id: row.get(1)?,
            mbti: row.get(2)?,
            created_at: DateTime::parse_from_rfc3339(&row.get::<String>(3)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    fn row_to_co_occurrence(row: &libsql::Row) -> Result<CoOccurrence> {
        Ok(CoOccurrence {
            place_id_low: row.get(0)?,
            place_id_high: row.get(1)?,
            co_users: row.get(2)?,
            weighted_co_users: row.get(3)?,
            last_co_bookmark_at: DateTime::parse_from_rfc3339(&row.get::<String>(4)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;
    use chrono::Duration;

    const WEIGHTS: MbtiWeights = MbtiWeights {
        same: 2.0,
        different: 1.0,
    };

    async fn setup_test_db() -> Connection {
        let conn = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap()
            .connect()
            .unwrap();
        init_schema(&conn).await.unwrap();
        conn
    }

    async fn bookmark(conn: &Connection, user_id: i64, place_id: i64, mbti: Option<&str>) {
        BookmarkRepository::add(conn, &Bookmark::new(user_id, place_id, mbti.map(String::from)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_co_occurrence_counts_and_weights() {
        // Given two users who bookmarked places 1 and 2, one with matching MBTI
        let conn = setup_test_db().await;
        bookmark(&conn, 10, 1, Some("INFP")).await;
        bookmark(&conn, 10, 2, Some("INFP")).await;
        bookmark(&conn, 11, 2, None).await;
        bookmark(&conn, 11, 1, None).await;
        bookmark(&conn, 12, 3, None).await;

        // When the pair is aggregated
        let co = BookmarkRepository::co_occurrence_for_pair(&conn, WEIGHTS, 2, 1)
            .await
            .unwrap()
            .unwrap();

        // Then both users count and only the MBTI match gets the higher weight
        assert_eq!((co.place_id_low, co.place_id_high), (1, 2));
        assert_eq!(co.co_users, 2);
        assert_eq!(co.weighted_co_users, 3.0);

        let none = BookmarkRepository::co_occurrence_for_pair(&conn, WEIGHTS, 1, 3)
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_co_occurrence_pages_in_pair_order() {
        let conn = setup_test_db().await;
        for place in 1..=4 {
            bookmark(&conn, 1, place, None).await;
        }

        let first = BookmarkRepository::co_occurrence_page(&conn, WEIGHTS, (0, 0), 4)
            .await
            .unwrap();
        let pairs: Vec<(i64, i64)> = first
            .iter()
            .map(|c| (c.place_id_low, c.place_id_high))
            .collect();
        assert_eq!(pairs, vec![(1, 2), (1, 3), (1, 4), (2, 3)]);

        let second = BookmarkRepository::co_occurrence_page(&conn, WEIGHTS, (2, 3), 4)
            .await
            .unwrap();
        let pairs: Vec<(i64, i64)> = second
            .iter()
            .map(|c| (c.place_id_low, c.place_id_high))
            .collect();
        assert_eq!(pairs, vec![(2, 4), (3, 4)]);
    }

    #[tokio::test]
    async fn test_user_counts_and_recent_places() {
        let conn = setup_test_db().await;
        let cutoff = Utc::now() - Duration::seconds(1);
        bookmark(&conn, 1, 5, None).await;
        bookmark(&conn, 2, 5, None).await;
        bookmark(&conn, 2, 6, None).await;

        let counts = BookmarkRepository::user_counts(&conn, &[5, 6, 7]).await.unwrap();
        assert_eq!(counts.get(&5), Some(&2));
        assert_eq!(counts.get(&6), Some(&1));
        assert_eq!(counts.get(&7), None);

        let recent = BookmarkRepository::places_changed_since(&conn, cutoff)
            .await
            .unwrap();
        assert_eq!(recent, vec![5, 6]);

        assert!(BookmarkRepository::remove(&conn, 2, 6).await.unwrap());
        assert!(!BookmarkRepository::remove(&conn, 2, 6).await.unwrap());
    }

    #[tokio::test]
    async fn test_removed_bookmark_marks_place_changed() {
        // Given an old bookmark that predates the cutoff
        let conn = setup_test_db().await;
        BookmarkRepository::add(
            &conn,
            &Bookmark {
                created_at: Utc::now() - Duration::days(3),
                ..Bookmark::new(1, 8, None)
            },
        )
        .await
        .unwrap();
        let cutoff = Utc::now() - Duration::seconds(1);
        assert!(BookmarkRepository::places_changed_since(&conn, cutoff)
            .await
            .unwrap()
            .is_empty());

        // When it is removed
        assert!(BookmarkRepository::remove(&conn, 1, 8).await.unwrap());

        // Then the place shows up as changed
        let changed = BookmarkRepository::places_changed_since(&conn, cutoff)
            .await
            .unwrap();
        assert_eq!(changed, vec![8]);
    }
}
