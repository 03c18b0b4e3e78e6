use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{ExtractionSource, PreferenceVector, VectorOwner};

fn table_for(owner: VectorOwner) -> &'static str {
    match owner {
        VectorOwner::User => "user_preference_vectors",
        VectorOwner::Place => "place_description_vectors",
    }
}

pub struct VectorRepository;

impl VectorRepository {
    pub async fn get(
        conn: &Connection,
        owner: VectorOwner,
        owner_id: i64,
    ) -> Result<Option<PreferenceVector>> {
        let sql = format!(
            r#"
            SELECT owner_id, vector, selected_keywords, extraction_source, model_name,
                   prompt_hash, confidence, version, created_at
            FROM {}
            WHERE owner_id = ?1
            "#,
            table_for(owner)
        );
        let mut rows = conn.query(&sql, params![owner_id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_vector(&row, owner)?))
        } else {
            Ok(None)
        }
    }

    /// Write `vector` by owner key, replacing any previous vector.
    pub async fn upsert(conn: &Connection, vector: &PreferenceVector) -> Result<()> {
        let sql = format!(
            r#"
            INSERT INTO {} (
                owner_id, vector, selected_keywords, extraction_source, model_name,
                prompt_hash, confidence, version, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(owner_id) DO UPDATE SET
                vector = excluded.vector,
                selected_keywords = excluded.selected_keywords,
                extraction_source = excluded.extraction_source,
                model_name = excluded.model_name,
                prompt_hash = excluded.prompt_hash,
                confidence = excluded.confidence,
                version = excluded.version,
                created_at = excluded.created_at
            "#,
            table_for(vector.owner)
        );

        conn.execute(
            &sql,
            params![
                vector.owner_id,
                serde_json::to_string(&vector.vector)?,
                serde_json::to_string(&vector.selected_keywords)?,
                vector.extraction_source.to_string(),
                vector.model_name.clone(),
                vector.prompt_hash.clone(),
                vector.confidence,
                vector.version,
                vector.created_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn list_owner_ids(conn: &Connection, owner: VectorOwner) -> Result<Vec<i64>> {
        let sql = format!("SELECT owner_id FROM {} ORDER BY owner_id ASC", table_for(owner));
        let mut rows = conn.query(&sql, ()).await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<i64>(0)?);
        }
        Ok(ids)
    }

    fn row_to_vector(row: &libsql::Row, owner: VectorOwner) -> Result<PreferenceVector> {
        Ok(PreferenceVector {
            owner,
            owner_id: row.get(0)?,
            vector: serde_json::from_str(&row.get::<String>(1)?)?,
            selected_keywords: serde_json::from_str(&row.get::<String>(2)?).unwrap_or_default(),
            extraction_source: row
                .get::<String>(3)?
                .parse()
                .unwrap_or_default(),
            model_name: row.get(4)?,
            prompt_hash: row.get(5)?,
            confidence: row.get(6)?,
            version: row.get(7)?,
            created_at: DateTime::parse_from_rfc3339(&row.get::<String>(8)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
