use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{Place, PlaceMbtiDescription, NEW_PLACE_WINDOW_DAYS, RECOMMENDABLE_MIN_RATING};

const PLACE_COLUMNS: &str = "id, name, category, description, location, latitude, longitude, \
    rating, review_count, opening_hours, tags, amenities, is_new_place, opened_date, first_seen_at";

/// Bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

pub struct PlaceRepository;

impl PlaceRepository {
    pub async fn upsert(conn: &Connection, place: &Place) -> Result<()> {
        let tags = serde_json::to_string(&place.tags)?;
        let amenities = serde_json::to_string(&place.amenities)?;

        conn.execute(
            r#"
            INSERT INTO places (
                id, name, category, description, location, latitude, longitude,
                rating, review_count, opening_hours, tags, amenities, is_new_place,
                opened_date, first_seen_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                description = excluded.description,
                location = excluded.location,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                rating = excluded.rating,
                review_count = excluded.review_count,
                opening_hours = excluded.opening_hours,
                tags = excluded.tags,
                amenities = excluded.amenities,
                is_new_place = excluded.is_new_place,
                opened_date = excluded.opened_date
            "#,
            params![
                place.id,
                place.name.clone(),
                place.category.clone(),
                place.description.clone(),
                place.location.clone(),
                place.latitude,
                place.longitude,
                place.rating,
                place.review_count,
                place.opening_hours.clone(),
                tags,
                amenities,
                place.is_new_place as i32,
                place.opened_date.map(|d| d.to_rfc3339()),
                place.first_seen_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Place>> {
        let sql = format!("SELECT {PLACE_COLUMNS} FROM places WHERE id = ?1");
        let mut rows = conn.query(&sql, params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_place(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn get_by_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<Place>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {PLACE_COLUMNS} FROM places WHERE id IN ({}) ORDER BY id ASC",
            placeholders(ids.len(), 1)
        );
        let values: Vec<libsql::Value> = ids.iter().map(|id| libsql::Value::from(*id)).collect();

        let mut rows = conn.query(&sql, libsql::params_from_iter(values)).await?;
        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_place(&row)?);
        }
        Ok(results)
    }

    /// Recommendable places ordered by rating, review count, then id.
    pub async fn top_rated(
        conn: &Connection,
        category: Option<&str>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Place>> {
        let new_since = (now - Duration::days(NEW_PLACE_WINDOW_DAYS)).to_rfc3339();
        let sql = format!(
            r#"
            SELECT {PLACE_COLUMNS} FROM places
            WHERE (rating >= ?1 OR is_new_place = 1 OR (opened_date IS NOT NULL AND opened_date >= ?2))
              AND (?3 IS NULL OR category = ?3 COLLATE NOCASE)
            ORDER BY rating DESC, review_count DESC, id ASC
            LIMIT ?4
            "#
        );
        let mut rows = conn
            .query(
                &sql,
                params![
                    RECOMMENDABLE_MIN_RATING,
                    new_since,
                    category.map(|c| c.to_string()),
                    limit as i64
                ],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_place(&row)?);
        }
        Ok(results)
    }

    /// Places rated at least `min_rating`, most reviewed first.
    pub async fn popular(
        conn: &Connection,
        min_rating: f64,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Place>> {
        let sql = format!(
            r#"
            SELECT {PLACE_COLUMNS} FROM places
            WHERE rating >= ?1 AND (?2 IS NULL OR category = ?2 COLLATE NOCASE)
            ORDER BY review_count DESC, rating DESC, id ASC
            LIMIT ?3
            "#
        );
        let mut rows = conn
            .query(
                &sql,
                params![min_rating, category.map(|c| c.to_string()), limit as i64],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_place(&row)?);
        }
        Ok(results)
    }

    pub async fn within_bounds(conn: &Connection, bounds: GeoBounds) -> Result<Vec<Place>> {
        let sql = format!(
            r#"
            SELECT {PLACE_COLUMNS} FROM places
            WHERE latitude BETWEEN ?1 AND ?2 AND longitude BETWEEN ?3 AND ?4
            ORDER BY id ASC
            "#
        );
        let mut rows = conn
            .query(
                &sql,
                params![bounds.min_lat, bounds.max_lat, bounds.min_lon, bounds.max_lon],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::row_to_place(&row)?);
        }
        Ok(results)
    }

    pub async fn list_ids(conn: &Connection) -> Result<Vec<i64>> {
        let mut rows = conn.query("SELECT id FROM places ORDER BY id ASC", ()).await?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<i64>(0)?);
        }
        Ok(ids)
    }

    pub async fn upsert_mbti_description(
        conn: &Connection,
        description: &PlaceMbtiDescription,
    ) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO place_mbti_descriptions (place_id, mbti, description)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(place_id, mbti) DO UPDATE SET description = excluded.description
            "#,
            params![
                description.place_id,
                description.mbti.to_uppercase(),
                description.description.clone()
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn get_mbti_description(
        conn: &Connection,
        place_id: i64,
        mbti: &str,
    ) -> Result<Option<String>> {
        let mut rows = conn
            .query(
                "SELECT description FROM place_mbti_descriptions WHERE place_id = ?1 AND mbti = ?2",
                params![place_id, mbti.to_uppercase()],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(row.get::<String>(0)?))
        } else {
            Ok(None)
        }
    }

    /// MBTI descriptions for `mbti` keyed by place id.
    pub async fn get_mbti_descriptions(
        conn: &Connection,
        place_ids: &[i64],
        mbti: &str,
    ) -> Result<HashMap<i64, String>> {
        if place_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT place_id, description FROM place_mbti_descriptions \
             WHERE mbti = ?1 AND place_id IN ({})",
            placeholders(place_ids.len(), 2)
        );
        let mut values = vec![libsql::Value::from(mbti.to_uppercase())];
        values.extend(place_ids.iter().map(|id| libsql::Value::from(*id)));

        let mut rows = conn.query(&sql, libsql::params_from_iter(values)).await?;
        let mut results = HashMap::new();
        while let Some(row) = rows.next().await? {
            results.insert(row.get::<i64>(0)?, row.get::<String>(1)?);
        }
        Ok(results)
    }

    fn row_to_place(row: &libsql::Row) -> Result<Place> {
        Ok(Place {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            description: row.get(3)?,
            location: row.get(4)?,
            latitude: row.get(5)?,
            longitude: row.get(6)?,
            rating: row.get::<Option<f64>>(7)?.unwrap_or(0.0),
            review_count: row.get::<Option<i64>>(8)?.unwrap_or(0),
            opening_hours: row.get(9)?,
            tags: row
                .get::<Option<String>>(10)?
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            amenities: row
                .get::<Option<String>>(11)?
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            is_new_place: row.get::<i32>(12)? != 0,
            opened_date: row
                .get::<Option<String>>(13)?
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            first_seen_at: DateTime::parse_from_rfc3339(&row.get::<String>(14)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

/// `?start, ?start+1, ...` positional placeholders.
pub(crate) fn placeholders(count: usize, start: usize) -> String {
    let mut out = String::new();
    for i in 0..count {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('?');
        out.push_str(&(start + i).to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;

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

    fn make_place(id: i64, rating: f64, reviews: i64, category: &str) -> Place {
        Place {
            rating,
            review_count: reviews,
            category: Some(category.to_string()),
            ..Place::new(id, format!("Place {id}"))
        }
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(3, 1), "?1, ?2, ?3");
        assert_eq!(placeholders(2, 4), "?4, ?5");
        assert_eq!(placeholders(0, 1), "");
    }

    #[tokio::test]
    async fn test_upsert_round_trips_json_columns() {
        let conn = setup_test_db().await;
        let place = Place {
            tags: vec!["quiet".to_string(), "wifi".to_string()],
            amenities: vec!["parking".to_string()],
            latitude: Some(37.5665),
            longitude: Some(126.978),
            ..make_place(1, 4.5, 120, "cafe")
        };
        PlaceRepository::upsert(&conn, &place).await.unwrap();

        let fetched = PlaceRepository::get_by_id(&conn, 1).await.unwrap().unwrap();
        assert_eq!(fetched.tags, place.tags);
        assert_eq!(fetched.amenities, place.amenities);
        assert_eq!(fetched.coordinates(), Some((37.5665, 126.978)));
    }

    #[tokio::test]
    async fn test_top_rated_orders_and_filters() {
        let conn = setup_test_db().await;
        let now = Utc::now();
        PlaceRepository::upsert(&conn, &make_place(1, 4.0, 10, "cafe")).await.unwrap();
        PlaceRepository::upsert(&conn, &make_place(2, 4.8, 5, "cafe")).await.unwrap();
        PlaceRepository::upsert(&conn, &make_place(3, 4.0, 50, "bar")).await.unwrap();
        PlaceRepository::upsert(&conn, &make_place(4, 2.0, 500, "cafe")).await.unwrap();

        let all = PlaceRepository::top_rated(&conn, None, 10, now).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        let cafes = PlaceRepository::top_rated(&conn, Some("cafe"), 10, now).await.unwrap();
        let ids: Vec<i64> = cafes.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_mbti_descriptions_lookup() {
        let conn = setup_test_db().await;
        PlaceRepository::upsert_mbti_description(
            &conn,
            &PlaceMbtiDescription {
                place_id: 5,
                mbti: "infp".to_string(),
                description: "A calm corner to read".to_string(),
            },
        )
        .await
        .unwrap();

        let single = PlaceRepository::get_mbti_description(&conn, 5, "INFP").await.unwrap();
        assert_eq!(single.as_deref(), Some("A calm corner to read"));

        let map = PlaceRepository::get_mbti_descriptions(&conn, &[5, 6], "infp")
            .await
            .unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&5));
    }
}
