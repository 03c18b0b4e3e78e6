use libsql::{params, Connection};

use crate::error::Result;
use crate::models::User;

pub struct UserRepository;

impl UserRepository {
    pub async fn upsert(conn: &Connection, user: &User) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO users (id, mbti, age_range, transportation, preferences)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                mbti = excluded.mbti,
                age_range = excluded.age_range,
                transportation = excluded.transportation,
                preferences = excluded.preferences
            "#,
            params![
                user.id,
                user.mbti.clone(),
                user.age_range.clone(),
                user.transportation.clone(),
                user.preferences.clone(),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn get_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
        let mut rows = conn
            .query(
                "SELECT id, mbti, age_range, transportation, preferences FROM users WHERE id = ?1",
                params![id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_user(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Users that have at least one bookmark, in id order.
    pub async fn list_active_ids(conn: &Connection) -> Result<Vec<i64>> {
        let mut rows = conn
            .query(
                "SELECT DISTINCT user_id FROM bookmarks ORDER BY user_id ASC",
                (),
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<i64>(0)?);
        }
        Ok(ids)
    }

    fn row_to_user(row: &libsql::Row) -> Result<User> {
        Ok(User {
            id: row.get(0)?,
            mbti: row.get(1)?,
            age_range: row.get(2)?,
            transportation: row.get(3)?,
            preferences: row.get(4)?,
        })
    }
}
